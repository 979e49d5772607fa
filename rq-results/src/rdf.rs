//! RDF-graph-based results (§6): a `QuerySolution` sequence or a boolean
//! re-expressed as triples using the `rs:` vocabulary, the way rasqal-lineage
//! engines hand results to a caller that only wants a graph. Turtle/RDF-XML
//! parsing and serialization themselves are an external collaborator's job
//! (§1 Non-goals) — this module only produces/consumes the `Vec<Triple>`
//! such a serializer would read from or write to.
use rq_model::{BlankNode, NamedNode, NamedOrBlankNode, Term, Triple};

pub mod rs {
    pub const NS: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#";
    pub const RESULT_SET: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#ResultSet";
    pub const RESULT_VARIABLE: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#resultVariable";
    pub const SOLUTION: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#solution";
    pub const BINDING: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#binding";
    pub const VALUE: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#value";
    pub const VARIABLE: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#variable";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/sw/DataAccess/tests/result-set#boolean";
}

use crate::QuerySolution;

/// Expands a solution sequence into `rs:`-vocabulary triples, minting a fresh
/// blank node per result set, per solution, and per binding.
pub fn solutions_to_triples<'a>(
    variables: &[rq_model::Variable],
    solutions: impl IntoIterator<Item = &'a QuerySolution>,
    mint_blank_node: &mut impl FnMut() -> BlankNode,
) -> Vec<Triple> {
    let mut triples = Vec::new();
    let result_set = NamedOrBlankNode::BlankNode(mint_blank_node());
    triples.push(Triple::new(result_set.clone(), NamedNode::new_unchecked(rq_model::vocab::rdf::TYPE), NamedNode::new_unchecked(rs::RESULT_SET)));
    for variable in variables {
        triples.push(Triple::new(result_set.clone(), NamedNode::new_unchecked(rs::RESULT_VARIABLE), Term::Literal(variable.as_str().into())));
    }
    for solution in solutions {
        let solution_node = NamedOrBlankNode::BlankNode(mint_blank_node());
        triples.push(Triple::new(result_set.clone(), NamedNode::new_unchecked(rs::SOLUTION), Term::from(solution_node.clone())));
        for (variable, value) in solution.iter() {
            let Some(value) = value else { continue };
            let binding_node = NamedOrBlankNode::BlankNode(mint_blank_node());
            triples.push(Triple::new(solution_node.clone(), NamedNode::new_unchecked(rs::BINDING), Term::from(binding_node.clone())));
            triples.push(Triple::new(binding_node.clone(), NamedNode::new_unchecked(rs::VARIABLE), Term::Literal(variable.as_str().into())));
            triples.push(Triple::new(binding_node, NamedNode::new_unchecked(rs::VALUE), value.clone()));
        }
    }
    triples
}

/// Expands a boolean result (ASK) into `rs:`-vocabulary triples.
pub fn boolean_to_triples(value: bool, mint_blank_node: &mut impl FnMut() -> BlankNode) -> Vec<Triple> {
    let result_set = NamedOrBlankNode::BlankNode(mint_blank_node());
    vec![
        Triple::new(result_set.clone(), NamedNode::new_unchecked(rq_model::vocab::rdf::TYPE), NamedNode::new_unchecked(rs::RESULT_SET)),
        Triple::new(result_set, NamedNode::new_unchecked(rs::BOOLEAN), Term::Literal(value.into())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_model::{Literal, Variable};
    use std::sync::Arc;

    #[test]
    fn boolean_result_set_carries_the_rs_boolean_triple() {
        let mut counter = 0u64;
        let mut mint = move || {
            counter += 1;
            BlankNode::new_unchecked(format!("b{counter}"))
        };
        let triples = boolean_to_triples(true, &mut mint);
        assert!(triples.iter().any(|t| t.predicate.as_str() == rs::BOOLEAN && t.object == Term::Literal(Literal::from(true))));
    }

    #[test]
    fn solution_set_emits_one_binding_triple_per_bound_variable() {
        let vars: Arc<[Variable]> = Arc::from(vec![Variable::new_unchecked("s")]);
        let solution = QuerySolution::new(vars, vec![Some(Term::Literal(Literal::new_simple("o")))], 0);
        let mut counter = 0u64;
        let mut mint = move || {
            counter += 1;
            BlankNode::new_unchecked(format!("b{counter}"))
        };
        let triples = solutions_to_triples(&[Variable::new_unchecked("s")], [&solution], &mut mint);
        assert_eq!(triples.iter().filter(|t| t.predicate.as_str() == rs::VALUE).count(), 1);
    }
}
