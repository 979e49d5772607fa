//! `Service` (§4.5, federated `SERVICE <iri> { ... }`): the network
//! dereference itself is an external collaborator (§1), so this rowsource
//! never dials out on its own — it consults an embedder-supplied
//! [`ServiceResolver`] instead, mirroring the teacher's
//! `ServiceHandler::handle(pattern, base_iri) -> QuerySolutionIter` seam
//! (`spareval::service`). `NO_NET` (§6) and "no resolver configured" both
//! take the same fail-fast-or-silent-empty path a genuinely unreachable
//! endpoint would (§9). `inner` is kept only for `--explain` rendering; the
//! raw (pre-lowering) pattern is what actually gets handed to the resolver.
use std::rc::Rc;

use rq_algebra::{GraphPattern, NamedOrVariable, VariablesTable};
use rq_model::{NamedNode, NamedOrBlankNode};

use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;

/// Evaluates a `SERVICE` clause's remote pattern against whatever transport
/// the embedder wires up (SPARQL-over-HTTP, a local mock, a federation
/// gateway, …). Returns the solutions it produced, already bound into
/// `Row`s against the query's own `VariablesTable` (so the resolver can
/// resolve the inner pattern's variable names to offsets via
/// `VariablesTable::get_by_name`).
pub trait ServiceResolver {
    fn resolve(&self, endpoint: &NamedNode, pattern: &GraphPattern, variables: &VariablesTable) -> Result<Vec<Row>, EvaluationError>;
}

pub struct ServiceRowsource {
    inner: Box<dyn Rowsource>,
    pattern: GraphPattern,
    name: NamedOrVariable,
    silent: bool,
    variables: VariablesTable,
    no_net: bool,
    resolver: Option<Rc<dyn ServiceResolver>>,
    rows: Option<std::vec::IntoIter<Row>>,
}

impl ServiceRowsource {
    pub fn new(
        inner: Box<dyn Rowsource>,
        pattern: GraphPattern,
        name: NamedOrVariable,
        silent: bool,
        variables: VariablesTable,
        no_net: bool,
        resolver: Option<Rc<dyn ServiceResolver>>,
    ) -> Self {
        Self {
            inner,
            pattern,
            name,
            silent,
            variables,
            no_net,
            resolver,
            rows: None,
        }
    }

    fn endpoint_description(&self) -> String {
        match &self.name {
            NamedOrVariable::Term(iri) => iri.to_string(),
            NamedOrVariable::Variable(_) => "<variable endpoint>".to_owned(),
        }
    }

    fn endpoint_name(&self) -> Option<NamedNode> {
        match &self.name {
            NamedOrVariable::Term(NamedOrBlankNode::NamedNode(n)) => Some(n.clone()),
            NamedOrVariable::Term(NamedOrBlankNode::BlankNode(_)) | NamedOrVariable::Variable(_) => None,
        }
    }

    fn unsupported(&self, reason: &str) -> Result<Vec<Row>, EvaluationError> {
        if self.silent {
            Ok(Vec::new())
        } else {
            Err(EvaluationError::UnsupportedService(format!("{} ({reason})", self.endpoint_description())))
        }
    }

    fn fetch(&self) -> Result<Vec<Row>, EvaluationError> {
        let Some(endpoint) = self.endpoint_name() else {
            return self.unsupported("endpoint is not a bound IRI");
        };
        if self.no_net {
            return self.unsupported("NO_NET is set");
        }
        let Some(resolver) = &self.resolver else {
            return self.unsupported("no service resolver configured");
        };
        match resolver.resolve(&endpoint, &self.pattern, &self.variables) {
            Ok(rows) => Ok(rows),
            Err(err) if self.silent => {
                let _ = err;
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

impl Rowsource for ServiceRowsource {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        if self.rows.is_none() {
            self.rows = Some(self.fetch()?.into_iter());
        }
        Ok(self.rows.as_mut().and_then(Iterator::next))
    }

    fn get_inner_rowsource(&self, index: usize) -> Option<&dyn Rowsource> {
        if index == 0 {
            Some(self.inner.as_ref())
        } else {
            None
        }
    }

    fn operator_name(&self) -> &'static str {
        "Service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_model::{Term, VariableKind};

    struct Empty(VariablesTable);
    impl Rowsource for Empty {
        fn variables(&self) -> &VariablesTable {
            &self.0
        }
        fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
            Ok(None)
        }
        fn operator_name(&self) -> &'static str {
            "Bgp"
        }
    }

    fn empty_inner(variables: VariablesTable) -> Box<dyn Rowsource> {
        Box::new(Empty(variables))
    }

    struct FixedResolver(Vec<Row>);
    impl ServiceResolver for FixedResolver {
        fn resolve(&self, _endpoint: &NamedNode, _pattern: &GraphPattern, _variables: &VariablesTable) -> Result<Vec<Row>, EvaluationError> {
            Ok(self.0.clone())
        }
    }

    struct FailingResolver;
    impl ServiceResolver for FailingResolver {
        fn resolve(&self, _endpoint: &NamedNode, _pattern: &GraphPattern, _variables: &VariablesTable) -> Result<Vec<Row>, EvaluationError> {
            Err(EvaluationError::runtime("endpoint unreachable"))
        }
    }

    fn table() -> VariablesTable {
        let mut table = VariablesTable::new();
        table.add("x", VariableKind::Normal);
        table
    }

    #[test]
    fn no_net_fails_fast_even_with_a_resolver_configured() {
        let variables = table();
        let resolver: Rc<dyn ServiceResolver> = Rc::new(FixedResolver(vec![Row::from_values(vec![Some(Term::Literal(rq_model::Literal::new_simple("x")))], 0)]));
        let pattern = GraphPattern::Bgp { patterns: Vec::new() };
        let mut rs = ServiceRowsource::new(
            empty_inner(variables.clone()),
            pattern,
            NamedOrVariable::Term(NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:endpoint"))),
            false,
            variables,
            true,
            Some(resolver),
        );
        assert!(matches!(rs.read_row(), Err(EvaluationError::UnsupportedService(_))));
    }

    #[test]
    fn no_net_silent_contributes_zero_rows() {
        let variables = table();
        let pattern = GraphPattern::Bgp { patterns: Vec::new() };
        let mut rs = ServiceRowsource::new(
            empty_inner(variables.clone()),
            pattern,
            NamedOrVariable::Term(NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:endpoint"))),
            true,
            variables,
            true,
            None,
        );
        assert_eq!(rs.read_row().unwrap(), None);
    }

    #[test]
    fn missing_resolver_fails_fast_when_not_silent() {
        let variables = table();
        let pattern = GraphPattern::Bgp { patterns: Vec::new() };
        let mut rs = ServiceRowsource::new(empty_inner(variables.clone()), pattern, NamedOrVariable::Term(NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:endpoint"))), false, variables, false, None);
        assert!(matches!(rs.read_row(), Err(EvaluationError::UnsupportedService(_))));
    }

    #[test]
    fn configured_resolver_streams_its_rows() {
        let variables = table();
        let row = Row::from_values(vec![Some(Term::Literal(rq_model::Literal::new_simple("hit")))], 0);
        let resolver: Rc<dyn ServiceResolver> = Rc::new(FixedResolver(vec![row.clone()]));
        let pattern = GraphPattern::Bgp { patterns: Vec::new() };
        let mut rs = ServiceRowsource::new(
            empty_inner(variables.clone()),
            pattern,
            NamedOrVariable::Term(NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:endpoint"))),
            false,
            variables,
            false,
            Some(resolver),
        );
        assert_eq!(rs.read_row().unwrap(), Some(row));
        assert_eq!(rs.read_row().unwrap(), None);
    }

    #[test]
    fn a_resolver_error_is_swallowed_when_silent() {
        let variables = table();
        let resolver: Rc<dyn ServiceResolver> = Rc::new(FailingResolver);
        let pattern = GraphPattern::Bgp { patterns: Vec::new() };
        let mut rs = ServiceRowsource::new(
            empty_inner(variables.clone()),
            pattern,
            NamedOrVariable::Term(NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:endpoint"))),
            true,
            variables,
            false,
            Some(resolver),
        );
        assert_eq!(rs.read_row().unwrap(), None);
    }

    #[test]
    fn a_variable_endpoint_is_unsupported() {
        let variables = table();
        let var = variables.get_by_name("x").unwrap();
        let pattern = GraphPattern::Bgp { patterns: Vec::new() };
        let mut rs = ServiceRowsource::new(empty_inner(variables.clone()), pattern, NamedOrVariable::Variable(var), false, variables, false, None);
        assert!(matches!(rs.read_row(), Err(EvaluationError::UnsupportedService(_))));
    }
}
