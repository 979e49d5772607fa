//! The triple-source capability set (§6, §9 "Triple-source abstraction as
//! capability set"): the one interface the evaluator consumes from the
//! external RDF store. Grounded on the teacher's `QueryableDataset` trait in
//! shape (an associated `Error` type, a pattern-matching entry point feeding
//! a lazily-advanced match object) but reworked to the constraint-aware,
//! resettable contract §4.6's backtracking join actually needs: a
//! `TriplesMatch` object the join can create once per column and then drive
//! with `bind_match`/`next_match`/`is_end` across many backtracking steps,
//! rather than a plain iterator.
use rq_model::{NamedNode, NamedOrBlankNode, Term, Variable};
use std::error::Error as StdError;

/// Which of a triple's four positions (subject, predicate, object, named
/// origin graph) a bitmask refers to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Parts(u8);

impl Parts {
    pub const NONE: Self = Self(0);
    pub const SUBJECT: Self = Self(0b0001);
    pub const PREDICATE: Self = Self(0b0010);
    pub const OBJECT: Self = Self(0b0100);
    pub const ORIGIN: Self = Self(0b1000);
    pub const ALL: Self = Self(0b1111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Parts {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A ground (fully bound) triple, optionally scoped to a named origin graph.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GroundTriple {
    pub subject: NamedOrBlankNode,
    pub predicate: NamedNode,
    pub object: Term,
    pub origin: Option<NamedOrBlankNode>,
}

/// A single triple-pattern position: either a value that must match exactly
/// (a literal from the query text, or a variable's value substituted in as a
/// constraint per §4.6 step 1) or a variable still waiting to be bound.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PatternTerm {
    Constant(Term),
    Variable(Variable),
}

/// A triple pattern ready to be matched: every position is either a
/// constraint or a to-bind variable. `parts_to_bind` names the positions
/// that are `Variable` (computed once at rowsource init time).
#[derive(Debug, Clone)]
pub struct MatchPattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
    pub origin: Option<PatternTerm>,
    pub parts_to_bind: Parts,
}

/// The capability set a triple store exposes to the evaluator (§9).
pub trait TripleSource {
    type Error: StdError + Send + Sync + 'static;
    type Match: TriplesMatch<Error = Self::Error>;

    /// Exact-match probe, used by `ASK`-like constructs and `FILTER EXISTS`
    /// fast paths over a fully ground triple.
    fn triple_present(&self, triple: &GroundTriple) -> Result<bool, Self::Error>;

    /// Creates (but does not yet position) an iterator over triples matching
    /// `pattern`'s constraints.
    fn new_triples_match(&self, pattern: &MatchPattern) -> Result<Self::Match, Self::Error>;

    /// The dataset's named graphs, consulted by the `Graph` rowsource when
    /// its origin is a variable (§4.5).
    fn named_graphs(&self) -> Result<Vec<NamedNode>, Self::Error>;
}

/// A (lazily advanced) match of one triple pattern against the store.
///
/// `next_match` must be called once before the first candidate is available;
/// a freshly created match that immediately has no candidates reports
/// `is_end() == true` after that first call.
pub trait TriplesMatch {
    type Error: StdError + Send + Sync + 'static;

    /// Writes the current candidate's bound-for positions into `row` by
    /// variable offset, returning the subset of `parts` actually written
    /// (a position whose pattern term was a constant, not a variable,
    /// contributes nothing even if requested).
    fn bind_match(&self, row: &mut [Option<Term>], offsets: &[(rq_algebra::VariableOffset, TriplePosition)]) -> Parts;

    /// Advances to the next candidate triple; `Ok(false)` once exhausted.
    fn next_match(&mut self) -> Result<bool, Self::Error>;

    fn is_end(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TriplePosition {
    Subject,
    Predicate,
    Object,
    Origin,
}
