//! SPARQL Query Results CSV and TSV Formats (§4.7), grounded on the
//! teacher's `sparesults::csv`: a small buffered writer that builds one line
//! of output per row into a reusable `String`, and a `memchr`-driven line
//! reader on the way in.
use crate::error::{ResultsParseError, ResultsWriteError};
use memchr::memchr;
use rq_model::{BlankNode, Literal, NamedNode, Term, Variable};
use std::io::{BufRead, Write};

pub fn write_boolean_csv(mut write: impl Write, value: bool) -> Result<(), ResultsWriteError> {
    write.write_all(if value { b"true" } else { b"false" })?;
    Ok(())
}

pub fn write_boolean_tsv(write: impl Write, value: bool) -> Result<(), ResultsWriteError> {
    write_boolean_csv(write, value)
}

pub struct CsvSolutionsWriter<W: Write> {
    write: W,
    variables: Vec<Variable>,
}

impl<W: Write> CsvSolutionsWriter<W> {
    pub fn start(mut write: W, variables: Vec<Variable>) -> Result<Self, ResultsWriteError> {
        let header = variables.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(",");
        write.write_all(header.as_bytes())?;
        write.write_all(b"\r\n")?;
        Ok(Self { write, variables })
    }

    pub fn write_row<'a>(&mut self, row: impl IntoIterator<Item = Option<&'a Term>>) -> Result<(), ResultsWriteError> {
        let mut line = String::new();
        for (i, value) in row.into_iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            if let Some(value) = value {
                write_csv_term(&mut line, value);
            }
        }
        let _ = &self.variables;
        line.push_str("\r\n");
        self.write.write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn finish(self) -> W {
        self.write
    }
}

fn write_csv_term(out: &mut String, term: &Term) {
    match term {
        Term::NamedNode(n) => write_csv_escaped(out, n.as_str()),
        Term::BlankNode(b) => {
            out.push_str("_:");
            out.push_str(b.as_str());
        }
        Term::Literal(l) => write_csv_escaped(out, l.value()),
    }
}

fn write_csv_escaped(out: &mut String, value: &str) {
    if value.contains([',', '"', '\n', '\r']) {
        out.push('"');
        for c in value.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
    } else {
        out.push_str(value);
    }
}

pub struct TsvSolutionsWriter<W: Write> {
    write: W,
}

impl<W: Write> TsvSolutionsWriter<W> {
    pub fn start(mut write: W, variables: &[Variable]) -> Result<Self, ResultsWriteError> {
        let header = variables.iter().map(|v| format!("?{}", v.as_str())).collect::<Vec<_>>().join("\t");
        write.write_all(header.as_bytes())?;
        write.write_all(b"\n")?;
        Ok(Self { write })
    }

    pub fn write_row<'a>(&mut self, row: impl IntoIterator<Item = Option<&'a Term>>) -> Result<(), ResultsWriteError> {
        let mut line = String::new();
        for (i, value) in row.into_iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            if let Some(value) = value {
                line.push_str(&term_to_tsv(value));
            }
        }
        line.push('\n');
        self.write.write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn finish(self) -> W {
        self.write
    }
}

fn term_to_tsv(term: &Term) -> String {
    match term {
        Term::NamedNode(n) => n.to_string(),
        Term::BlankNode(b) => b.to_string(),
        Term::Literal(l) => l.to_string(),
    }
}

/// Reads a TSV results document's header line, returning the variable list
/// and the remaining reader positioned at the first data row.
pub fn read_tsv_header<R: BufRead>(mut source: R) -> Result<(Vec<Variable>, R), ResultsParseError> {
    let mut header = String::new();
    source.read_line(&mut header)?;
    let variables = header
        .trim_end()
        .split('\t')
        .filter(|s| !s.is_empty())
        .map(|s| Variable::new(s.trim_start_matches('?')).map_err(|e| ResultsParseError::Syntax { format: "tsv", message: e.to_string() }))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((variables, source))
}

/// Reads one TSV data line into term cells, `None` for an empty (unbound)
/// cell; `None` overall once the input is exhausted.
pub fn read_tsv_row(line: &str) -> Result<Vec<Option<Term>>, ResultsParseError> {
    line.trim_end_matches(['\n', '\r']).split('\t').map(parse_tsv_cell).collect()
}

fn parse_tsv_cell(cell: &str) -> Result<Option<Term>, ResultsParseError> {
    if cell.is_empty() {
        return Ok(None);
    }
    if let Some(iri) = cell.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return Ok(Some(Term::NamedNode(NamedNode::new(iri).map_err(|e| syntax_error(e.to_string()))?)));
    }
    if let Some(id) = cell.strip_prefix("_:") {
        return Ok(Some(Term::BlankNode(BlankNode::new(id).map_err(|e| syntax_error(e.to_string()))?)));
    }
    if let Some(rest) = cell.strip_prefix('"') {
        let close = memchr(b'"', rest.as_bytes()).ok_or_else(|| syntax_error("unterminated literal".to_owned()))?;
        let value = unescape_tsv_literal(&rest[..close]);
        let tail = &rest[close + 1..];
        if let Some(lang) = tail.strip_prefix('@') {
            return Ok(Some(Term::Literal(Literal::new_lang_tagged(value, lang).map_err(|e| syntax_error(e.to_string()))?)));
        }
        if let Some(datatype) = tail.strip_prefix("^^<").and_then(|s| s.strip_suffix('>')) {
            return Ok(Some(Term::Literal(Literal::new_typed(value, NamedNode::new(datatype).map_err(|e| syntax_error(e.to_string()))?))));
        }
        return Ok(Some(Term::Literal(Literal::new_simple(value))));
    }
    // A bare numeric or boolean lexical form (TSV permits unquoted literals).
    Ok(Some(Term::Literal(Literal::new_simple(cell))))
}

fn unescape_tsv_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn syntax_error(message: String) -> ResultsParseError {
    ResultsParseError::Syntax { format: "tsv", message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_round_trips_a_typed_literal() {
        let literal = r#""42"^^<http://www.w3.org/2001/XMLSchema#integer>"#;
        let parsed = parse_tsv_cell(literal).unwrap().unwrap();
        assert_eq!(parsed, Term::Literal(Literal::new_typed("42", NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer"))));
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        let mut out = String::new();
        write_csv_escaped(&mut out, "a,\"b\"");
        assert_eq!(out, "\"a,\"\"b\"\"\"");
    }
}
