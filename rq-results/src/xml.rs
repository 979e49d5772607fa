//! SPARQL Query Results XML Format read/write (§4.7), grounded on the
//! teacher's `sparesults::xml` module: an incremental writer built directly
//! on `quick_xml::Writer`, and a SAX-style reader state machine over the
//! `sparql`/`head`/`variable`/`results`/`result`/`binding`/`uri`/`bnode`/
//! `literal`/`boolean` tags §4.7 names.
use crate::error::{ResultsParseError, ResultsWriteError};
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rq_model::{BlankNode, Literal, NamedNode, Term, Variable};
use std::io::{BufRead, Write};

const NS: &str = "http://www.w3.org/2005/sparql-results#";

pub fn write_boolean_xml(sink: impl Write, value: bool) -> Result<(), ResultsWriteError> {
    let mut writer = Writer::new(sink);
    write_decl_and_open(&mut writer)?;
    write_empty_head(&mut writer, &[])?;
    write_text_element(&mut writer, "boolean", if value { "true" } else { "false" })?;
    writer.write_event(Event::End(quick_xml::events::BytesEnd::new("sparql")))?;
    Ok(())
}

pub struct XmlSolutionsWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlSolutionsWriter<W> {
    pub fn start(sink: W, variables: &[Variable]) -> Result<Self, ResultsWriteError> {
        let mut writer = Writer::new(sink);
        write_decl_and_open(&mut writer)?;
        write_empty_head(&mut writer, variables)?;
        writer.write_event(Event::Start(BytesStart::new("results")))?;
        Ok(Self { writer })
    }

    pub fn write_row<'a>(&mut self, row: impl IntoIterator<Item = (&'a Variable, Option<&'a Term>)>) -> Result<(), ResultsWriteError> {
        self.writer.write_event(Event::Start(BytesStart::new("result")))?;
        for (variable, value) in row {
            let Some(value) = value else { continue };
            let mut binding = BytesStart::new("binding");
            binding.push_attribute(("name", variable.as_str()));
            self.writer.write_event(Event::Start(binding))?;
            write_term(&mut self.writer, value)?;
            self.writer.write_event(Event::End(quick_xml::events::BytesEnd::new("binding")))?;
        }
        self.writer.write_event(Event::End(quick_xml::events::BytesEnd::new("result")))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, ResultsWriteError> {
        self.writer.write_event(Event::End(quick_xml::events::BytesEnd::new("results")))?;
        self.writer.write_event(Event::End(quick_xml::events::BytesEnd::new("sparql")))?;
        Ok(self.writer.into_inner())
    }
}

fn write_decl_and_open<W: Write>(writer: &mut Writer<W>) -> Result<(), ResultsWriteError> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut sparql = BytesStart::new("sparql");
    sparql.push_attribute(("xmlns", NS));
    writer.write_event(Event::Start(sparql))?;
    Ok(())
}

fn write_empty_head<W: Write>(writer: &mut Writer<W>, variables: &[Variable]) -> Result<(), ResultsWriteError> {
    writer.write_event(Event::Start(BytesStart::new("head")))?;
    for variable in variables {
        let mut tag = BytesStart::new("variable");
        tag.push_attribute(("name", variable.as_str()));
        writer.write_event(Event::Empty(tag))?;
    }
    writer.write_event(Event::End(quick_xml::events::BytesEnd::new("head")))?;
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), ResultsWriteError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(quick_xml::events::BytesEnd::new(name)))?;
    Ok(())
}

fn write_term<W: Write>(writer: &mut Writer<W>, term: &Term) -> Result<(), ResultsWriteError> {
    match term {
        Term::NamedNode(n) => write_text_element(writer, "uri", n.as_str()),
        Term::BlankNode(b) => write_text_element(writer, "bnode", b.as_str()),
        Term::Literal(l) => {
            let mut tag = BytesStart::new("literal");
            if let Some(lang) = l.language() {
                tag.push_attribute(("xml:lang", lang));
            } else if !l.is_plain() {
                tag.push_attribute(("datatype", l.datatype().as_str()));
            }
            writer.write_event(Event::Start(tag))?;
            writer.write_event(Event::Text(BytesText::new(l.value())))?;
            writer.write_event(Event::End(quick_xml::events::BytesEnd::new("literal")))?;
            Ok(())
        }
    }
}

/// Either an empty-variable-list boolean result or the variable header of a
/// solutions sequence, returned once the `<head>` has been fully consumed.
pub enum XmlHeader {
    Boolean(bool),
    Solutions(Vec<Variable>),
}

/// Reads the `<head>` (and, for a boolean result, the `<boolean>` value too)
/// from `source`, handing back a reader positioned to stream `<result>`
/// elements for the solutions case.
pub fn read_header<R: BufRead>(source: R) -> Result<(XmlHeader, XmlSolutionsReader<R>), ResultsParseError> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut variables = Vec::new();
    let mut in_head = false;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_syntax_error)? {
            Event::Start(tag) if tag.name().as_ref() == b"head" => in_head = true,
            Event::Empty(tag) if in_head && tag.name().as_ref() == b"variable" => {
                let name = attribute(&tag, "name")?;
                variables.push(Variable::new(name).map_err(|e| syntax_error(e.to_string()))?);
            }
            Event::End(tag) if tag.name().as_ref() == b"head" => in_head = false,
            Event::Start(tag) if tag.name().as_ref() == b"boolean" => {
                let text = read_text(&mut reader, &mut buf)?;
                return Ok((XmlHeader::Boolean(text == "true"), XmlSolutionsReader { reader, buf: Vec::new() }));
            }
            Event::Start(tag) if tag.name().as_ref() == b"results" => {
                return Ok((XmlHeader::Solutions(variables), XmlSolutionsReader { reader, buf: Vec::new() }));
            }
            Event::Eof => return Err(syntax_error("unexpected end of document before <results>".to_owned())),
            _ => {}
        }
        buf.clear();
    }
}

pub struct XmlSolutionsReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> XmlSolutionsReader<R> {
    /// Parses the next `<result>` element into `(name, term)` pairs; `None`
    /// once `</results>` is reached.
    pub fn read_next(&mut self) -> Result<Option<Vec<(String, Term)>>, ResultsParseError> {
        loop {
            match self.reader.read_event_into(&mut self.buf).map_err(xml_syntax_error)? {
                Event::Start(tag) if tag.name().as_ref() == b"result" => return self.read_result().map(Some),
                Event::End(tag) if tag.name().as_ref() == b"results" => return Ok(None),
                Event::Eof => return Err(syntax_error("unexpected end of document inside <results>".to_owned())),
                _ => {}
            }
        }
    }

    fn read_result(&mut self) -> Result<Vec<(String, Term)>, ResultsParseError> {
        let mut bindings = Vec::new();
        loop {
            let mut buf = Vec::new();
            match self.reader.read_event_into(&mut buf).map_err(xml_syntax_error)? {
                Event::Start(tag) if tag.name().as_ref() == b"binding" => {
                    let name = attribute(&tag, "name")?;
                    let term = self.read_term()?;
                    bindings.push((name, term));
                }
                Event::End(tag) if tag.name().as_ref() == b"result" => return Ok(bindings),
                Event::Eof => return Err(syntax_error("unexpected end of document inside <result>".to_owned())),
                _ => {}
            }
        }
    }

    fn read_term(&mut self) -> Result<Term, ResultsParseError> {
        loop {
            let mut buf = Vec::new();
            match self.reader.read_event_into(&mut buf).map_err(xml_syntax_error)? {
                Event::Start(tag) => {
                    let name = tag.name().as_ref().to_vec();
                    let lang = attribute(&tag, "xml:lang").ok();
                    let datatype = attribute(&tag, "datatype").ok();
                    let text = read_text(&mut self.reader, &mut self.buf)?;
                    return build_term(&name, text, lang, datatype);
                }
                Event::Eof => return Err(syntax_error("expected a term element inside <binding>".to_owned())),
                _ => {}
            }
        }
    }
}

fn build_term(tag_name: &[u8], text: String, lang: Option<String>, datatype: Option<String>) -> Result<Term, ResultsParseError> {
    match tag_name {
        b"uri" => Ok(Term::NamedNode(NamedNode::new(text).map_err(|e| syntax_error(e.to_string()))?)),
        b"bnode" => Ok(Term::BlankNode(BlankNode::new(text).map_err(|e| syntax_error(e.to_string()))?)),
        b"literal" => Ok(Term::Literal(if let Some(lang) = lang {
            Literal::new_lang_tagged(text, lang).map_err(|e| syntax_error(e.to_string()))?
        } else if let Some(datatype) = datatype {
            Literal::new_typed(text, NamedNode::new(datatype).map_err(|e| syntax_error(e.to_string()))?)
        } else {
            Literal::new_simple(text)
        })),
        other => Err(syntax_error(format!("unexpected term element <{}>", String::from_utf8_lossy(other)))),
    }
}

fn read_text<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<String, ResultsParseError> {
    let mut text = String::new();
    loop {
        buf.clear();
        match reader.read_event_into(buf).map_err(xml_syntax_error)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(xml_syntax_error)?),
            Event::End(_) => return Ok(text),
            Event::Eof => return Err(syntax_error("unexpected end of document while reading text".to_owned())),
            _ => {}
        }
    }
}

fn attribute(tag: &BytesStart<'_>, name: &str) -> Result<String, ResultsParseError> {
    for attr in tag.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(attr.unescape_value().map_err(xml_syntax_error)?.into_owned());
        }
    }
    Err(syntax_error(format!("missing {name:?} attribute")))
}

fn syntax_error(message: String) -> ResultsParseError {
    ResultsParseError::Syntax { format: "xml", message }
}

fn xml_syntax_error(error: impl std::fmt::Display) -> ResultsParseError {
    syntax_error(error.to_string())
}

impl From<quick_xml::Error> for ResultsWriteError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::Other, error.to_string()))
    }
}
