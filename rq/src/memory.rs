//! An in-memory [`TripleSource`] (§9: "implementations include an in-memory
//! hash/BTree store, a file-backed parser-fed store, and remote SERVICE
//! adapters") built for this workspace's own integration tests and doc
//! examples, not as a deliverable (§0 explicitly cuts a persistent/indexed
//! triple store from scope). Grounded directly on the `MemoryStore`/
//! `MemoryMatch` fixtures `rq_eval::triples_rowsource`'s own unit tests
//! already use to exercise the backtracking join, generalized here into a
//! public, reusable type that also carries each fact's optional origin
//! graph so `GRAPH` queries (`ops::graph`) have something to iterate over.
use std::cell::RefCell;

use rq_eval::{GroundTriple, MatchPattern, Parts, PatternTerm, TriplePosition, TripleSource, TriplesMatch};
use rq_algebra::VariableOffset;
use rq_model::{NamedNode, NamedOrBlankNode, Term};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fact {
    subject: NamedOrBlankNode,
    predicate: NamedNode,
    object: Term,
    origin: Option<NamedOrBlankNode>,
}

/// A plain `Vec<Fact>` scanned linearly on every pattern match — adequate
/// for the handful of facts the test scenarios and doc examples need, not a
/// storage engine.
#[derive(Debug, Default)]
pub struct MemoryTripleSource {
    facts: Vec<Fact>,
}

#[derive(Debug, thiserror::Error)]
#[error("in-memory triple source error")]
pub struct MemoryTripleSourceError;

impl MemoryTripleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fact to the default graph.
    pub fn insert(&mut self, subject: impl Into<NamedOrBlankNode>, predicate: NamedNode, object: impl Into<Term>) -> &mut Self {
        self.facts.push(Fact {
            subject: subject.into(),
            predicate,
            object: object.into(),
            origin: None,
        });
        self
    }

    /// Adds a fact scoped to the named graph `graph`.
    pub fn insert_in(&mut self, graph: impl Into<NamedOrBlankNode>, subject: impl Into<NamedOrBlankNode>, predicate: NamedNode, object: impl Into<Term>) -> &mut Self {
        self.facts.push(Fact {
            subject: subject.into(),
            predicate,
            object: object.into(),
            origin: Some(graph.into()),
        });
        self
    }
}

fn term_matches(pattern: &PatternTerm, candidate: &Term) -> bool {
    match pattern {
        PatternTerm::Constant(t) => t == candidate,
        PatternTerm::Variable(_) => true,
    }
}

/// `pattern.origin == None` means "any graph of the active dataset" (§3),
/// matching regardless of whether a fact carries an origin at all; `Graph`'s
/// `set_origin` override always supplies a `Constant`, never a bare
/// `Variable`, so the `Variable` arm only ever fires for a raw `MatchPattern`
/// built straight from a `TriplePattern` with a variable origin position.
fn origin_matches(pattern: &Option<PatternTerm>, origin: &Option<NamedOrBlankNode>) -> bool {
    match pattern {
        None => true,
        Some(PatternTerm::Variable(_)) => origin.is_some(),
        Some(PatternTerm::Constant(t)) => origin.as_ref().is_some_and(|o| &Term::from(o.clone()) == t),
    }
}

fn part_for(position: TriplePosition) -> Parts {
    match position {
        TriplePosition::Subject => Parts::SUBJECT,
        TriplePosition::Predicate => Parts::PREDICATE,
        TriplePosition::Object => Parts::OBJECT,
        TriplePosition::Origin => Parts::ORIGIN,
    }
}

impl TripleSource for MemoryTripleSource {
    type Error = MemoryTripleSourceError;
    type Match = MemoryMatch;

    fn triple_present(&self, triple: &GroundTriple) -> Result<bool, Self::Error> {
        Ok(self
            .facts
            .iter()
            .any(|f| f.subject == triple.subject && f.predicate == triple.predicate && f.object == triple.object && f.origin == triple.origin))
    }

    fn new_triples_match(&self, pattern: &MatchPattern) -> Result<Self::Match, Self::Error> {
        let candidates = self
            .facts
            .iter()
            .filter(|f| term_matches(&pattern.subject, &Term::from(f.subject.clone())))
            .filter(|f| term_matches(&pattern.predicate, &Term::NamedNode(f.predicate.clone())))
            .filter(|f| term_matches(&pattern.object, &f.object))
            .filter(|f| origin_matches(&pattern.origin, &f.origin))
            .cloned()
            .collect();
        Ok(MemoryMatch {
            candidates,
            position: RefCell::new(-1),
        })
    }

    fn named_graphs(&self) -> Result<Vec<NamedNode>, Self::Error> {
        let mut graphs: Vec<NamedNode> = self
            .facts
            .iter()
            .filter_map(|f| match &f.origin {
                Some(NamedOrBlankNode::NamedNode(n)) => Some(n.clone()),
                _ => None,
            })
            .collect();
        graphs.sort();
        graphs.dedup();
        Ok(graphs)
    }
}

pub struct MemoryMatch {
    candidates: Vec<Fact>,
    position: RefCell<isize>,
}

impl TriplesMatch for MemoryMatch {
    type Error = MemoryTripleSourceError;

    fn bind_match(&self, row: &mut [Option<Term>], offsets: &[(VariableOffset, TriplePosition)]) -> Parts {
        let mut bound = Parts::NONE;
        let position = *self.position.borrow();
        let Some(fact) = (position >= 0).then(|| self.candidates.get(position as usize)).flatten() else {
            return bound;
        };
        for &(offset, part) in offsets {
            let value = match part {
                TriplePosition::Subject => Term::from(fact.subject.clone()),
                TriplePosition::Predicate => Term::NamedNode(fact.predicate.clone()),
                TriplePosition::Object => fact.object.clone(),
                TriplePosition::Origin => match &fact.origin {
                    Some(o) => Term::from(o.clone()),
                    None => continue,
                },
            };
            row[offset.0] = Some(value);
            bound = bound.union(part_for(part));
        }
        bound
    }

    fn next_match(&mut self) -> Result<bool, Self::Error> {
        let mut position = self.position.borrow_mut();
        *position += 1;
        Ok((*position as usize) < self.candidates.len())
    }

    fn is_end(&self) -> bool {
        let position = *self.position.borrow();
        position < 0 || position as usize >= self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_match_all_returns_the_one_fact() {
        let mut store = MemoryTripleSource::new();
        store.insert(NamedNode::new_unchecked("urn:s"), NamedNode::new_unchecked("urn:p"), Term::Literal(rq_model::Literal::new_simple("o")));
        let pattern = MatchPattern {
            subject: PatternTerm::Variable(rq_model::Variable::new_unchecked("s")),
            predicate: PatternTerm::Variable(rq_model::Variable::new_unchecked("p")),
            object: PatternTerm::Variable(rq_model::Variable::new_unchecked("o")),
            origin: None,
            parts_to_bind: Parts::ALL,
        };
        let mut m = store.new_triples_match(&pattern).unwrap();
        assert!(m.next_match().unwrap());
        assert!(!m.is_end());
        assert!(!m.next_match().unwrap());
        assert!(m.is_end());
    }

    #[test]
    fn named_graphs_reports_only_graphs_actually_used() {
        let mut store = MemoryTripleSource::new();
        let g = NamedNode::new_unchecked("urn:g");
        store.insert(NamedNode::new_unchecked("urn:s"), NamedNode::new_unchecked("urn:p"), NamedNode::new_unchecked("urn:o"));
        store.insert_in(g.clone(), NamedNode::new_unchecked("urn:s2"), NamedNode::new_unchecked("urn:p"), NamedNode::new_unchecked("urn:o2"));
        assert_eq!(store.named_graphs().unwrap(), vec![g]);
    }
}
