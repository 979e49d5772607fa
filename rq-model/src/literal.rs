use crate::named_node::NamedNode;
use crate::vocab::{rdf, xsd};
use oxilangtag::{LanguageTag, LanguageTagParseError};
use std::fmt;
use std::fmt::Write;

/// An RDF [literal](https://www.w3.org/TR/rdf11-concepts/#dfn-literal): a lexical
/// form plus either a language tag (for `rdf:langString`) or a datatype IRI.
///
/// §3 invariant: a language tag and a non-string datatype are mutually
/// exclusive — enforced here by construction, not by a runtime check.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Literal(LiteralContent);

#[derive(PartialEq, Eq, Debug, Clone, Hash)]
enum LiteralContent {
    String(String),
    LanguageTaggedString { value: String, language: String },
    Typed { value: String, datatype: NamedNode },
}

impl Literal {
    /// Builds a simple literal (datatype `xsd:string`).
    #[inline]
    pub fn new_simple(value: impl Into<String>) -> Self {
        Self(LiteralContent::String(value.into()))
    }

    /// Builds a typed literal. `xsd:string` collapses to a simple literal.
    #[inline]
    pub fn new_typed(value: impl Into<String>, datatype: impl Into<NamedNode>) -> Self {
        let value = value.into();
        let datatype = datatype.into();
        Self(if datatype.as_str() == xsd::STRING {
            LiteralContent::String(value)
        } else {
            LiteralContent::Typed { value, datatype }
        })
    }

    /// Builds a language-tagged string, validating and lowercasing the tag.
    pub fn new_lang_tagged(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, LanguageTagParseError> {
        let mut language = language.into();
        language.make_ascii_lowercase();
        LanguageTag::parse(language.clone())?;
        Ok(Self::new_lang_tagged_unchecked(value, language))
    }

    #[inline]
    pub fn new_lang_tagged_unchecked(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self(LiteralContent::LanguageTaggedString {
            value: value.into(),
            language: language.into(),
        })
    }

    #[inline]
    pub fn value(&self) -> &str {
        match &self.0 {
            LiteralContent::String(v)
            | LiteralContent::LanguageTaggedString { value: v, .. }
            | LiteralContent::Typed { value: v, .. } => v,
        }
    }

    #[inline]
    pub fn language(&self) -> Option<&str> {
        match &self.0 {
            LiteralContent::LanguageTaggedString { language, .. } => Some(language),
            _ => None,
        }
    }

    #[inline]
    pub fn datatype(&self) -> NamedNode {
        match &self.0 {
            LiteralContent::String(_) => NamedNode::new_unchecked(xsd::STRING),
            LiteralContent::LanguageTaggedString { .. } => NamedNode::new_unchecked(rdf::LANG_STRING),
            LiteralContent::Typed { datatype, .. } => datatype.clone(),
        }
    }

    /// True for language-tagged strings and `xsd:string` literals — RDF 1.0's
    /// notion of a "plain literal".
    #[inline]
    pub fn is_plain(&self) -> bool {
        matches!(
            self.0,
            LiteralContent::String(_) | LiteralContent::LanguageTaggedString { .. }
        )
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_quoted_str(self.value(), f)?;
        match &self.0 {
            LiteralContent::String(_) => Ok(()),
            LiteralContent::LanguageTaggedString { language, .. } => write!(f, "@{language}"),
            LiteralContent::Typed { datatype, .. } => write!(f, "^^{datatype}"),
        }
    }
}

impl From<&str> for Literal {
    #[inline]
    fn from(value: &str) -> Self {
        Self(LiteralContent::String(value.to_owned()))
    }
}

impl From<String> for Literal {
    #[inline]
    fn from(value: String) -> Self {
        Self(LiteralContent::String(value))
    }
}

impl From<bool> for Literal {
    #[inline]
    fn from(value: bool) -> Self {
        Self::new_typed(value.to_string(), NamedNode::new_unchecked(xsd::BOOLEAN))
    }
}

/// Escapes a lexical form the way N-Triples/Turtle/SPARQL expect.
pub fn print_quoted_str(string: &str, f: &mut impl Write) -> fmt::Result {
    f.write_char('"')?;
    for c in string.chars() {
        match c {
            '\u{08}' => f.write_str("\\b"),
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\u{0c}' => f.write_str("\\f"),
            '\r' => f.write_str("\\r"),
            '"' => f.write_str("\\\""),
            '\\' => f.write_str("\\\\"),
            '\0'..='\u{1f}' | '\u{7f}' => write!(f, "\\u{:04X}", u32::from(c)),
            c => f.write_char(c),
        }?;
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_literal_equals_xsd_string() {
        assert_eq!(
            Literal::new_simple("foo"),
            Literal::new_typed("foo", NamedNode::new_unchecked(xsd::STRING))
        );
    }

    #[test]
    fn lang_tag_is_lowercased() {
        let lit = Literal::new_lang_tagged("Bonjour", "FR").unwrap();
        assert_eq!(lit.language(), Some("fr"));
    }

    #[test]
    fn escaping_round_trips_control_chars() {
        assert_eq!(Literal::from("a\nb\tc").to_string(), "\"a\\nb\\tc\"");
    }
}
