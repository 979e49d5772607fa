use std::fmt;

/// An RDF [blank node](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node): an
/// opaque local identifier, scoped to whichever graph or query produced it.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct BlankNode(String);

impl BlankNode {
    /// Creates a blank node from an explicit local identifier.
    ///
    /// The identifier must be non-empty; validity against the N-Triples/Turtle
    /// grammar beyond that is the caller's responsibility (`new_unchecked` is
    /// the same operation under a name that makes no promises).
    pub fn new(id: impl Into<String>) -> Result<Self, BlankNodeIdParseError> {
        let id = id.into();
        if id.is_empty() {
            return Err(BlankNodeIdParseError);
        }
        Ok(Self(id))
    }

    #[inline]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BlankNode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BlankNodeIdParseError;

impl fmt::Display for BlankNodeIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blank node identifiers must be non-empty")
    }
}

impl std::error::Error for BlankNodeIdParseError {}
