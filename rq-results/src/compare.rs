//! Result-set comparison (§4.9): are two solution sequences "the same
//! answer", up to the blank-node-identity strategy the caller asks for and a
//! row-order-insensitive multiset match. Grounded on the multiset-equality
//! idiom the teacher's SPARQL-compliance suites use to compare an engine's
//! answer against an expected result set, rather than requiring row order.
use crate::error::ComparisonError;
use crate::QuerySolution;
use rq_model::{BlankNode, NamedOrBlankNode, Term};
use std::collections::HashMap;

/// How blank nodes in two result sets are matched against each other.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BlankNodeMatching {
    /// Any blank node matches any other blank node (position-independent).
    MatchAny,
    /// Blank nodes must carry identical local identifiers.
    MatchId,
    /// Blank nodes are matched by the consistent substitution that makes the
    /// two sequences isomorphic, the way RDF graph isomorphism is checked.
    MatchStructure,
}

pub struct ComparisonOptions {
    pub blank_nodes: BlankNodeMatching,
    pub max_differences: Option<usize>,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self { blank_nodes: BlankNodeMatching::MatchStructure, max_differences: None }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ComparisonReport {
    pub equal: bool,
    /// Rows present in the actual sequence with no match in the expected one
    /// (and vice versa via `missing`), bounded by `max_differences`.
    pub unexpected: Vec<QuerySolution>,
    pub missing: Vec<QuerySolution>,
    pub truncated: bool,
}

/// Compares two bindings-style result sequences for equality as unordered
/// multisets of rows, per `options`.
pub fn compare_solutions(
    expected: &[QuerySolution],
    actual: &[QuerySolution],
    options: &ComparisonOptions,
) -> Result<ComparisonReport, ComparisonError> {
    if let (Some(e), Some(a)) = (expected.first(), actual.first()) {
        if e.variables() != a.variables() {
            return Err(ComparisonError::IncompatibleVariables);
        }
    }

    let mut remaining_actual: Vec<&QuerySolution> = actual.iter().collect();
    let mut missing = Vec::new();
    let mut truncated = false;

    for expected_row in expected {
        let position = remaining_actual
            .iter()
            .position(|actual_row| rows_match(expected_row, actual_row, options.blank_nodes));
        match position {
            Some(i) => {
                remaining_actual.remove(i);
            }
            None => {
                if let Some(limit) = options.max_differences {
                    if missing.len() >= limit {
                        truncated = true;
                        break;
                    }
                }
                missing.push(expected_row.clone());
            }
        }
    }
    let unexpected: Vec<QuerySolution> = remaining_actual.into_iter().cloned().collect();
    let unexpected = match options.max_differences {
        Some(limit) if unexpected.len() > limit => {
            truncated = true;
            unexpected.into_iter().take(limit).collect()
        }
        _ => unexpected,
    };

    Ok(ComparisonReport { equal: missing.is_empty() && unexpected.is_empty(), unexpected, missing, truncated })
}

/// Boolean (ASK) result comparison: trivial equality, kept as a function so
/// callers don't special-case result kinds at the call site.
pub fn compare_booleans(expected: bool, actual: bool) -> bool {
    expected == actual
}

fn rows_match(expected: &QuerySolution, actual: &QuerySolution, matching: BlankNodeMatching) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    match matching {
        BlankNodeMatching::MatchAny | BlankNodeMatching::MatchId => {
            expected.iter().zip(actual.iter()).all(|((_, e), (_, a))| terms_match(e, a, matching))
        }
        BlankNodeMatching::MatchStructure => {
            let mut mapping = HashMap::new();
            expected.iter().zip(actual.iter()).all(|((_, e), (_, a))| structurally_match(e, a, &mut mapping))
        }
    }
}

fn terms_match(expected: Option<&Term>, actual: Option<&Term>, matching: BlankNodeMatching) -> bool {
    match (expected, actual) {
        (None, None) => true,
        (Some(Term::BlankNode(_)), Some(Term::BlankNode(_))) if matching == BlankNodeMatching::MatchAny => true,
        (Some(e), Some(a)) => e == a,
        _ => false,
    }
}

fn structurally_match(expected: Option<&Term>, actual: Option<&Term>, mapping: &mut HashMap<BlankNode, BlankNode>) -> bool {
    match (expected, actual) {
        (None, None) => true,
        (Some(Term::BlankNode(e)), Some(Term::BlankNode(a))) => match mapping.get(e) {
            Some(bound) => bound == a,
            None => {
                if mapping.values().any(|v| v == a) {
                    false
                } else {
                    mapping.insert(e.clone(), a.clone());
                    true
                }
            }
        },
        (Some(e), Some(a)) => e == a,
        _ => false,
    }
}

/// Graph-result comparison is a structural-isomorphism check over triples
/// rather than over rows; reused here as a thin wrapper so both result kinds
/// share one blank-node-matching vocabulary.
pub fn compare_graphs(
    expected: &[rq_model::Triple],
    actual: &[rq_model::Triple],
    matching: BlankNodeMatching,
) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    match matching {
        BlankNodeMatching::MatchId => expected.iter().all(|t| actual.contains(t)),
        BlankNodeMatching::MatchAny => {
            let mut remaining: Vec<&rq_model::Triple> = actual.iter().collect();
            expected.iter().all(|e| {
                let position = remaining.iter().position(|a| triple_matches_any(e, a));
                match position {
                    Some(i) => {
                        remaining.remove(i);
                        true
                    }
                    None => false,
                }
            })
        }
        BlankNodeMatching::MatchStructure => {
            let mut mapping = HashMap::new();
            expected.iter().zip(actual.iter()).all(|(e, a)| triple_structurally_match(e, a, &mut mapping))
        }
    }
}

fn triple_matches_any(e: &rq_model::Triple, a: &rq_model::Triple) -> bool {
    subject_matches_any(&e.subject, &a.subject) && e.predicate == a.predicate && terms_match(Some(&e.object), Some(&a.object), BlankNodeMatching::MatchAny)
}

fn subject_matches_any(e: &NamedOrBlankNode, a: &NamedOrBlankNode) -> bool {
    matches!((e, a), (NamedOrBlankNode::BlankNode(_), NamedOrBlankNode::BlankNode(_))) || e == a
}

fn triple_structurally_match(e: &rq_model::Triple, a: &rq_model::Triple, mapping: &mut HashMap<BlankNode, BlankNode>) -> bool {
    if e.predicate != a.predicate {
        return false;
    }
    let subjects_match = match (&e.subject, &a.subject) {
        (NamedOrBlankNode::BlankNode(eb), NamedOrBlankNode::BlankNode(ab)) => match mapping.get(eb) {
            Some(bound) => bound == ab,
            None => {
                mapping.insert(eb.clone(), ab.clone());
                true
            }
        },
        (e, a) => e == a,
    };
    subjects_match && structurally_match(Some(&e.object), Some(&a.object), mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_model::{Literal, Variable};
    use std::sync::Arc;

    fn row(vars: &Arc<[Variable]>, value: Option<Term>) -> QuerySolution {
        QuerySolution::new(vars.clone(), vec![value], 0)
    }

    #[test]
    fn row_order_does_not_affect_equality() {
        let vars: Arc<[Variable]> = Arc::from(vec![Variable::new_unchecked("x")]);
        let a = vec![row(&vars, Some(Term::Literal(Literal::new_simple("1")))), row(&vars, Some(Term::Literal(Literal::new_simple("2"))))];
        let b = vec![row(&vars, Some(Term::Literal(Literal::new_simple("2")))), row(&vars, Some(Term::Literal(Literal::new_simple("1"))))];
        let report = compare_solutions(&a, &b, &ComparisonOptions::default()).unwrap();
        assert!(report.equal);
    }

    #[test]
    fn match_structure_requires_a_consistent_blank_node_mapping() {
        let vars: Arc<[Variable]> = Arc::from(vec![Variable::new_unchecked("x"), Variable::new_unchecked("y")]);
        let expected = vec![QuerySolution::new(
            vars.clone(),
            vec![Some(Term::BlankNode(BlankNode::new_unchecked("e1"))), Some(Term::BlankNode(BlankNode::new_unchecked("e1")))],
            0,
        )];
        let inconsistent = vec![QuerySolution::new(
            vars.clone(),
            vec![Some(Term::BlankNode(BlankNode::new_unchecked("a1"))), Some(Term::BlankNode(BlankNode::new_unchecked("a2")))],
            0,
        )];
        let options = ComparisonOptions { blank_nodes: BlankNodeMatching::MatchStructure, max_differences: None };
        let report = compare_solutions(&expected, &inconsistent, &options).unwrap();
        assert!(!report.equal);
    }
}
