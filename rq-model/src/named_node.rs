use oxiri::{Iri, IriParseError};
use std::cmp::Ordering;
use std::fmt;

/// An RDF [IRI](https://www.w3.org/TR/rdf11-concepts/#dfn-iri).
///
/// Displays in N-Triples/Turtle/SPARQL form: `<http://example.com/foo>`.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct NamedNode {
    iri: String,
}

impl NamedNode {
    /// Builds and validates an RDF IRI.
    pub fn new(iri: impl Into<String>) -> Result<Self, IriParseError> {
        let iri = Iri::parse(iri.into())?;
        Ok(Self {
            iri: iri.into_inner(),
        })
    }

    /// Builds an RDF IRI without validation.
    ///
    /// It is the caller's responsibility to ensure `iri` is a valid IRI; this
    /// is used for terms coming from an already-validated triple source.
    #[inline]
    pub fn new_unchecked(iri: impl Into<String>) -> Self {
        Self { iri: iri.into() }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.iri
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.iri
    }
}

impl fmt::Display for NamedNode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.iri)
    }
}

impl PartialEq<str> for NamedNode {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for NamedNode {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<&NamedNode> for NamedNode {
    #[inline]
    fn from(node: &NamedNode) -> Self {
        node.clone()
    }
}

// Ordering beyond Eq/Ord derive is by lexical IRI, which is what scope.order()
// and OrderBy's stable tie-break rely on for deterministic output (§8 property 1).
impl NamedNode {
    pub fn cmp_str(&self, other: &str) -> Ordering {
        self.iri.as_str().cmp(other)
    }
}
