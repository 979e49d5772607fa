//! `--explain`-style plan inspection (§2 of SPEC_FULL's supplemented-features
//! section): walks the rowsource tree built by `planner::plan_query` via
//! [`Rowsource::get_inner_rowsource`]/[`Rowsource::operator_name`] and renders
//! it as an indented plan, one line per rowsource. Grounded on the shape of
//! the teacher's `QueryExplanation` (`spareval::eval::EvalNodeWithStats`,
//! walked recursively over its `children`), simplified to plain indented
//! text rather than JSON-with-timing-stats since this crate's `Rowsource`
//! trait doesn't carry per-node execution statistics.
use crate::rowsource::Rowsource;

/// Renders `rowsource`'s tree as an indented plan. Each line is the
/// operator's name (`Rowsource::operator_name`) plus the variables it
/// exposes; children are indented two spaces under their parent.
pub fn explain(rowsource: &dyn Rowsource) -> String {
    let mut out = String::new();
    write_node(rowsource, 0, &mut out);
    out
}

fn write_node(rowsource: &dyn Rowsource, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(rowsource.operator_name());
    let width = rowsource.variables().count();
    out.push_str(&format!(" (width={width})"));
    out.push('\n');
    let mut index = 0;
    while let Some(child) = rowsource.get_inner_rowsource(index) {
        write_node(child, depth + 1, out);
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;
    use crate::row::Row;
    use rq_algebra::VariablesTable;
    use rq_model::VariableKind;

    struct Leaf {
        variables: VariablesTable,
        name: &'static str,
    }

    impl Rowsource for Leaf {
        fn variables(&self) -> &VariablesTable {
            &self.variables
        }

        fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
            Ok(None)
        }

        fn operator_name(&self) -> &'static str {
            self.name
        }
    }

    struct Wrapper {
        variables: VariablesTable,
        inner: Box<dyn Rowsource>,
    }

    impl Rowsource for Wrapper {
        fn variables(&self) -> &VariablesTable {
            &self.variables
        }

        fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
            Ok(None)
        }

        fn get_inner_rowsource(&self, index: usize) -> Option<&dyn Rowsource> {
            if index == 0 {
                Some(self.inner.as_ref())
            } else {
                None
            }
        }

        fn operator_name(&self) -> &'static str {
            "Wrapper"
        }
    }

    #[test]
    fn nested_tree_is_rendered_indented_one_line_per_operator() {
        let mut vars = VariablesTable::new();
        vars.add("x", VariableKind::Normal);
        let leaf = Leaf {
            variables: vars.clone(),
            name: "Bgp",
        };
        let tree = Wrapper {
            variables: vars,
            inner: Box::new(leaf),
        };
        let rendered = explain(&tree);
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("Wrapper (width=1)"));
        assert_eq!(lines.next(), Some("  Bgp (width=1)"));
        assert_eq!(lines.next(), None);
    }
}
