//! Result-set serialization formats and auto-detection (§6). Grounded on the
//! teacher's `sparesults::QueryResultsFormat`, extended with the two
//! RDF-graph-based result formats (`rs:` vocabulary over Turtle or RDF/XML)
//! §6 lists alongside XML/JSON/CSV/TSV.
use std::fmt;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
#[non_exhaustive]
pub enum ResultsFormat {
    /// SPARQL Query Results XML Format.
    Xml,
    /// SPARQL Query Results JSON Format.
    Json,
    /// SPARQL Query Results CSV Format.
    Csv,
    /// SPARQL Query Results TSV Format.
    Tsv,
    /// Results encoded as an RDF graph in Turtle, using the `rs:` vocabulary.
    Turtle,
    /// Results encoded as an RDF graph in RDF/XML, using the `rs:` vocabulary.
    RdfXml,
}

impl ResultsFormat {
    pub fn iri(self) -> &'static str {
        match self {
            Self::Xml => "http://www.w3.org/ns/formats/SPARQL_Results_XML",
            Self::Json => "http://www.w3.org/ns/formats/SPARQL_Results_JSON",
            Self::Csv => "http://www.w3.org/ns/formats/SPARQL_Results_CSV",
            Self::Tsv => "http://www.w3.org/ns/formats/SPARQL_Results_TSV",
            Self::Turtle => "http://www.w3.org/ns/formats/Turtle",
            Self::RdfXml => "http://www.w3.org/ns/formats/RDF_XML",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Xml => "application/sparql-results+xml",
            Self::Json => "application/sparql-results+json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Tsv => "text/tab-separated-values; charset=utf-8",
            Self::Turtle => "text/turtle",
            Self::RdfXml => "application/rdf+xml",
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Xml => "srx",
            Self::Json => "srj",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Turtle => "ttl",
            Self::RdfXml => "rdf",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Xml => "SPARQL Results in XML",
            Self::Json => "SPARQL Results in JSON",
            Self::Csv => "SPARQL Results in CSV",
            Self::Tsv => "SPARQL Results in TSV",
            Self::Turtle => "SPARQL Results as an RDF graph in Turtle",
            Self::RdfXml => "SPARQL Results as an RDF graph in RDF/XML",
        }
    }

    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let (r#type, subtype) = media_type.split_once(';').unwrap_or((media_type, "")).0.trim().split_once('/')?;
        if !r#type.eq_ignore_ascii_case("application") && !r#type.eq_ignore_ascii_case("text") {
            return None;
        }
        let subtype = subtype.trim();
        let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
        match_ci(
            subtype,
            &[
                ("csv", Self::Csv),
                ("json", Self::Json),
                ("sparql-results+json", Self::Json),
                ("sparql-results+xml", Self::Xml),
                ("tab-separated-values", Self::Tsv),
                ("tsv", Self::Tsv),
                ("xml", Self::Xml),
                ("turtle", Self::Turtle),
                ("rdf+xml", Self::RdfXml),
            ],
        )
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match_ci(
            extension,
            &[
                ("csv", Self::Csv),
                ("json", Self::Json),
                ("srj", Self::Json),
                ("srx", Self::Xml),
                ("tsv", Self::Tsv),
                ("xml", Self::Xml),
                ("ttl", Self::Turtle),
                ("n3", Self::Turtle),
                ("rdf", Self::RdfXml),
            ],
        )
    }

    /// Identifier-URI detection (§6): the canonical format IRI itself, or a
    /// filename-shaped URI whose suffix resolves via [`from_extension`].
    pub fn from_identifier_uri(uri: &str) -> Option<Self> {
        for format in [Self::Xml, Self::Json, Self::Csv, Self::Tsv, Self::Turtle, Self::RdfXml] {
            if format.iri() == uri {
                return Some(format);
            }
        }
        let suffix = uri.rsplit('.').next()?;
        Self::from_extension(suffix)
    }

    /// Content sniffing (§6): cheap syntactic prefixes, tried before falling
    /// back to a filename suffix.
    pub fn sniff(content: &[u8]) -> Option<Self> {
        let head = std::str::from_utf8(&content[..content.len().min(256)]).ok()?.trim_start();
        if head.starts_with('{') {
            Some(Self::Json)
        } else if head.starts_with("<?xml") || head.starts_with("<sparql") {
            Some(Self::Xml)
        } else if head.starts_with("<rdf:RDF") {
            Some(Self::RdfXml)
        } else if head.starts_with('?') || head.contains('\t') {
            Some(Self::Tsv)
        } else {
            None
        }
    }
}

fn match_ci<T: Copy>(needle: &str, table: &[(&str, T)]) -> Option<T> {
    table.iter().find(|(k, _)| k.eq_ignore_ascii_case(needle)).map(|(_, v)| *v)
}

impl fmt::Display for ResultsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection_accepts_aliases() {
        assert_eq!(ResultsFormat::from_extension("n3"), Some(ResultsFormat::Turtle));
        assert_eq!(ResultsFormat::from_extension("srj"), Some(ResultsFormat::Json));
    }

    #[test]
    fn sniff_detects_json_and_xml() {
        assert_eq!(ResultsFormat::sniff(b"  { \"head\": {} }"), Some(ResultsFormat::Json));
        assert_eq!(ResultsFormat::sniff(b"<?xml version=\"1.0\"?><sparql/>"), Some(ResultsFormat::Xml));
    }
}
