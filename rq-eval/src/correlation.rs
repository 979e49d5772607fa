//! Correlation analysis for `MINUS`/`EXISTS`/`NOT EXISTS` (§4.8, SPARQL 1.2
//! §8.1.1): which variables an inner pattern references that are bound by an
//! outer scope but not already lexically visible inside the inner one. Those
//! variables must be substituted into the inner pattern's row before it runs,
//! rather than relying on ordinary join-variable sharing, because the inner
//! scope's own variable table never mentions them.
use crate::row::Row;
use rq_algebra::{GraphPattern, Scope, VariableOffset};

/// The outer-provided, inner-free variables a `MINUS`/`EXISTS`/`NOT EXISTS`
/// must substitute before evaluating its right-hand/inner pattern.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CorrelationSet {
    variables: Vec<VariableOffset>,
}

impl CorrelationSet {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[VariableOffset] {
        &self.variables
    }
}

/// Walks `inner`'s referenced variables and classifies each against the two
/// scopes (§4.8's algorithm, verbatim): provided by `outer_scope` (bound
/// there, not merely visible through it) and not already `defines`d — local
/// or inherited — by `inner_scope`. Nested `Diff` subtrees are inspected too,
/// since a correlated inner `MINUS` makes its enclosing one correlated (the
/// substitution the enclosing `MINUS` performs is exactly what makes the
/// nested one's outer-provided variables reachable at all).
///
/// `inner_scope` must be the right-hand/inner pattern's own scope as a
/// sibling of `outer_scope` under their common ancestor, not a descendant of
/// it: `ScopeTree` propagates a scope's locals into every descendant's
/// `visible` set regardless of creation order, so a true ancestor/descendant
/// pair always makes `defines` trivially true for anything `outer_scope`
/// provides.
pub fn correlate(inner: &GraphPattern, outer_scope: &Scope, inner_scope: &Scope) -> CorrelationSet {
    let mut referenced = Vec::new();
    inner.referenced_variables(&mut referenced);
    collect_nested_diff_variables(inner, &mut referenced);
    referenced.sort_unstable_by_key(|v| v.0);
    referenced.dedup();

    let variables = referenced.into_iter().filter(|&v| outer_scope.provides(v) && !inner_scope.defines(v)).collect();
    CorrelationSet { variables }
}

fn collect_nested_diff_variables(pattern: &GraphPattern, out: &mut Vec<VariableOffset>) {
    if let GraphPattern::Diff { right, .. } = pattern {
        right.referenced_variables(out);
    }
    for child in pattern.children() {
        collect_nested_diff_variables(child, out);
    }
}

/// Copies each correlated variable's value from `outer_row` into `target`
/// ahead of evaluating the inner pattern, per §4.8's substitute operation.
/// Variables unbound in `outer_row` are left untouched rather than forced
/// unbound, since `target` starts fresh for every outer row.
pub fn substitute(target: &mut Row, outer_row: &Row, correlated: &CorrelationSet) {
    for &offset in &correlated.variables {
        if let Some(value) = outer_row.get(offset) {
            target.set(offset, Some(value.clone()));
        }
    }
}

/// Reverses [`substitute`] once the inner pattern has finished matching for
/// this outer row, so a substituted value never leaks into a later read of
/// the same rowsource instance (§4.8: "unbind again afterward").
pub fn unsubstitute(target: &mut Row, correlated: &CorrelationSet) {
    for &offset in &correlated.variables {
        target.unset(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_algebra::{ScopeKind, ScopeTree, VariablesTable};
    use rq_model::{Term, VariableKind};

    fn offset(table: &mut VariablesTable, name: &str) -> VariableOffset {
        table.add(name, VariableKind::Normal)
    }

    fn triple_pattern_on(s: VariableOffset) -> GraphPattern {
        GraphPattern::Bgp {
            patterns: vec![rq_algebra::TriplePattern::new(
                rq_algebra::NamedOrVariable::Variable(s),
                rq_algebra::NamedOrVariable::Term(rq_model::NamedOrBlankNode::NamedNode(rq_model::NamedNode::new_unchecked("urn:p"))),
                rq_algebra::TermOrVariable::Term(Term::Literal(rq_model::Literal::new_simple("x"))),
            )],
        }
    }

    #[test]
    fn a_variable_bound_outside_and_free_inside_is_correlated() {
        let mut table = VariablesTable::new();
        let s = offset(&mut table, "s");
        let mut tree = ScopeTree::new_root();
        let root = tree.root();
        let outer = tree.new_child(root, ScopeKind::Group).unwrap();
        tree.add_variable(outer, s);
        let minus_scope = tree.new_child(root, ScopeKind::Minus).unwrap();

        let set = correlate(&triple_pattern_on(s), tree.get(outer), tree.get(minus_scope));
        assert_eq!(set.variables(), &[s]);
    }

    #[test]
    fn a_variable_already_visible_inside_is_not_correlated() {
        let mut table = VariablesTable::new();
        let s = offset(&mut table, "s");
        let mut tree = ScopeTree::new_root();
        let root = tree.root();
        let outer = tree.new_child(root, ScopeKind::Group).unwrap();
        tree.add_variable(outer, s);
        let minus_scope = tree.new_child(root, ScopeKind::Minus).unwrap();
        tree.add_variable(minus_scope, s);

        let set = correlate(&triple_pattern_on(s), tree.get(outer), tree.get(minus_scope));
        assert!(set.is_empty());
    }

    #[test]
    fn substitute_then_unsubstitute_round_trips() {
        let outer = Row::from_values(vec![Some(Term::Literal(rq_model::Literal::new_simple("v")))], 0);
        let mut target = Row::new(1, 0);
        let correlated = CorrelationSet {
            variables: vec![VariableOffset(0)],
        };
        substitute(&mut target, &outer, &correlated);
        assert!(target.get(VariableOffset(0)).is_some());
        unsubstitute(&mut target, &correlated);
        assert!(target.get(VariableOffset(0)).is_none());
    }
}
