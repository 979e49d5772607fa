//! Triple patterns (§3): four positions, each either a bound term or a
//! variable reference, with an optional origin graph.
use crate::variables::VariableOffset;
use rq_model::{NamedOrBlankNode, NamedNode, Term};
use std::fmt;

/// A single triple-pattern position: a fixed term, or a reference to a
/// variable that the pattern binds when matched.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TermOrVariable {
    Term(Term),
    Variable(VariableOffset),
}

impl fmt::Display for TermOrVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(t) => write!(f, "{t}"),
            Self::Variable(v) => write!(f, "?{}", v.0),
        }
    }
}

impl From<Term> for TermOrVariable {
    fn from(value: Term) -> Self {
        Self::Term(value)
    }
}

impl From<NamedNode> for TermOrVariable {
    fn from(value: NamedNode) -> Self {
        Self::Term(Term::NamedNode(value))
    }
}

/// Subject/graph-name position: a named or blank node pattern, or a
/// variable — narrower than [`TermOrVariable`] because a literal can never
/// be a subject or a graph name.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum NamedOrVariable {
    Term(NamedOrBlankNode),
    Variable(VariableOffset),
}

impl From<NamedOrVariable> for TermOrVariable {
    fn from(value: NamedOrVariable) -> Self {
        match value {
            NamedOrVariable::Term(t) => Self::Term(t.into()),
            NamedOrVariable::Variable(v) => Self::Variable(v),
        }
    }
}

/// Four positions plus an optional origin graph (§3). `origin: None` matches
/// in any graph of the active dataset; `Some` restricts to that named graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TriplePattern {
    pub subject: NamedOrVariable,
    pub predicate: NamedOrVariable,
    pub object: TermOrVariable,
    pub origin: Option<NamedOrVariable>,
}

impl TriplePattern {
    pub fn new(subject: NamedOrVariable, predicate: NamedOrVariable, object: TermOrVariable) -> Self {
        Self {
            subject,
            predicate,
            object,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: NamedOrVariable) -> Self {
        self.origin = Some(origin);
        self
    }

    /// The variable offsets this pattern references, in position order,
    /// deduplicated on first occurrence — the order §4.6's constraint
    /// analysis relies on when deciding which occurrence "binds" a column.
    pub fn variables(&self) -> impl Iterator<Item = VariableOffset> + '_ {
        [
            as_variable(&self.subject.clone().into()),
            as_variable(&self.predicate.clone().into()),
            as_variable(&self.object),
            self.origin.clone().map(|o| as_variable(&o.into())).flatten(),
        ]
        .into_iter()
        .flatten()
    }
}

fn as_variable(t: &TermOrVariable) -> Option<VariableOffset> {
    match t {
        TermOrVariable::Variable(v) => Some(*v),
        TermOrVariable::Term(_) => None,
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject: TermOrVariable = self.subject.clone().into();
        let predicate: TermOrVariable = self.predicate.clone().into();
        write!(f, "{subject} {predicate} {}", self.object)
    }
}
