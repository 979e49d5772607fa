use crate::blank_node::BlankNode;
use crate::literal::Literal;
use crate::named_node::NamedNode;
use std::fmt;

/// An RDF term: the tagged value every triple position (other than a
/// variable) holds. §3: "unbound" is a distinct sentinel, never a `Term`.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Term {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl Term {
    #[inline]
    pub fn is_named_node(&self) -> bool {
        matches!(self, Self::NamedNode(_))
    }

    #[inline]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    #[inline]
    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            Self::NamedNode(n) => Some(n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(n) => n.fmt(f),
            Self::BlankNode(b) => b.fmt(f),
            Self::Literal(l) => l.fmt(f),
        }
    }
}

impl From<NamedNode> for Term {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<BlankNode> for Term {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl From<Literal> for Term {
    #[inline]
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

/// A subject or graph-name position: named node or blank node, never a
/// literal. Kept as a thin newtype rather than a third enum so callers can
/// still reach for `Term` uniformly; conversion is fallible the other way.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum NamedOrBlankNode {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl fmt::Display for NamedOrBlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(n) => n.fmt(f),
            Self::BlankNode(b) => b.fmt(f),
        }
    }
}

impl From<NamedOrBlankNode> for Term {
    fn from(value: NamedOrBlankNode) -> Self {
        match value {
            NamedOrBlankNode::NamedNode(n) => Self::NamedNode(n),
            NamedOrBlankNode::BlankNode(b) => Self::BlankNode(b),
        }
    }
}

impl TryFrom<Term> for NamedOrBlankNode {
    type Error = TermKindError;

    fn try_from(value: Term) -> Result<Self, Self::Error> {
        match value {
            Term::NamedNode(n) => Ok(Self::NamedNode(n)),
            Term::BlankNode(b) => Ok(Self::BlankNode(b)),
            Term::Literal(_) => Err(TermKindError),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TermKindError;

impl fmt::Display for TermKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "term has the wrong kind for this position")
    }
}

impl std::error::Error for TermKindError {}

/// A ground RDF triple, produced by a `Triples` rowsource once every position
/// is bound, or by CONSTRUCT expansion (§4.7).
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Triple {
    pub subject: NamedOrBlankNode,
    pub predicate: NamedNode,
    pub object: Term,
}

impl Triple {
    pub fn new(
        subject: impl Into<NamedOrBlankNode>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

impl From<NamedNode> for NamedOrBlankNode {
    fn from(value: NamedNode) -> Self {
        Self::NamedNode(value)
    }
}

impl From<BlankNode> for NamedOrBlankNode {
    fn from(value: BlankNode) -> Self {
        Self::BlankNode(value)
    }
}
