//! SPARQL Query Results JSON Format read/write, built on `json-event-parser`
//! the way the teacher's `sparesults::json` is: a flat `JsonEvent` buffer per
//! row, fed through a streaming serializer rather than building a `Value`
//! tree first.
use crate::error::{ResultsParseError, ResultsWriteError};
use json_event_parser::{JsonEvent, ReaderJsonParser, WriterJsonSerializer};
use rq_model::{BlankNode, Literal, NamedNode, Term, Variable};
use std::collections::HashMap;
use std::io::{Read, Write};

pub fn write_boolean_json(writer: impl Write, value: bool) -> Result<(), ResultsWriteError> {
    let mut serializer = WriterJsonSerializer::new(writer);
    for event in [
        JsonEvent::StartObject,
        JsonEvent::ObjectKey("head".into()),
        JsonEvent::StartObject,
        JsonEvent::EndObject,
        JsonEvent::ObjectKey("boolean".into()),
        JsonEvent::Boolean(value),
        JsonEvent::EndObject,
    ] {
        serializer.serialize_event(event)?;
    }
    serializer.finish()?;
    Ok(())
}

pub struct JsonSolutionsWriter<W: Write> {
    serializer: WriterJsonSerializer<W>,
    started_results: bool,
}

impl<W: Write> JsonSolutionsWriter<W> {
    pub fn start(writer: W, variables: &[Variable]) -> Result<Self, ResultsWriteError> {
        let mut serializer = WriterJsonSerializer::new(writer);
        serializer.serialize_event(JsonEvent::StartObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("head".into()))?;
        serializer.serialize_event(JsonEvent::StartObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("vars".into()))?;
        serializer.serialize_event(JsonEvent::StartArray)?;
        for variable in variables {
            serializer.serialize_event(JsonEvent::String(variable.as_str().into()))?;
        }
        serializer.serialize_event(JsonEvent::EndArray)?;
        serializer.serialize_event(JsonEvent::EndObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("results".into()))?;
        serializer.serialize_event(JsonEvent::StartObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("bindings".into()))?;
        serializer.serialize_event(JsonEvent::StartArray)?;
        Ok(Self { serializer, started_results: true })
    }

    pub fn write_row<'a>(&mut self, row: impl IntoIterator<Item = (&'a Variable, Option<&'a Term>)>) -> Result<(), ResultsWriteError> {
        self.serializer.serialize_event(JsonEvent::StartObject)?;
        for (variable, value) in row {
            let Some(value) = value else { continue };
            self.serializer.serialize_event(JsonEvent::ObjectKey(variable.as_str().into()))?;
            write_term(&mut self.serializer, value)?;
        }
        self.serializer.serialize_event(JsonEvent::EndObject)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, ResultsWriteError> {
        if self.started_results {
            self.serializer.serialize_event(JsonEvent::EndArray)?;
            self.serializer.serialize_event(JsonEvent::EndObject)?;
            self.serializer.serialize_event(JsonEvent::EndObject)?;
        }
        Ok(self.serializer.finish()?)
    }
}

fn write_term<W: Write>(serializer: &mut WriterJsonSerializer<W>, term: &Term) -> Result<(), ResultsWriteError> {
    serializer.serialize_event(JsonEvent::StartObject)?;
    serializer.serialize_event(JsonEvent::ObjectKey("type".into()))?;
    match term {
        Term::NamedNode(n) => {
            serializer.serialize_event(JsonEvent::String("uri".into()))?;
            serializer.serialize_event(JsonEvent::ObjectKey("value".into()))?;
            serializer.serialize_event(JsonEvent::String(n.as_str().into()))?;
        }
        Term::BlankNode(b) => {
            serializer.serialize_event(JsonEvent::String("bnode".into()))?;
            serializer.serialize_event(JsonEvent::ObjectKey("value".into()))?;
            serializer.serialize_event(JsonEvent::String(b.as_str().into()))?;
        }
        Term::Literal(l) => {
            serializer.serialize_event(JsonEvent::String("literal".into()))?;
            serializer.serialize_event(JsonEvent::ObjectKey("value".into()))?;
            serializer.serialize_event(JsonEvent::String(l.value().into()))?;
            if let Some(lang) = l.language() {
                serializer.serialize_event(JsonEvent::ObjectKey("xml:lang".into()))?;
                serializer.serialize_event(JsonEvent::String(lang.into()))?;
            } else if !l.is_plain() {
                serializer.serialize_event(JsonEvent::ObjectKey("datatype".into()))?;
                serializer.serialize_event(JsonEvent::String(l.datatype().as_str().into()))?;
            }
        }
    }
    serializer.serialize_event(JsonEvent::EndObject)?;
    Ok(())
}

pub enum JsonHeader {
    Boolean(bool),
    Solutions(Vec<Variable>),
}

/// Parses the `head`/`boolean` prefix of a results document, returning a
/// reader positioned to stream `results.bindings` array elements.
pub fn read_header<R: Read>(source: R) -> Result<(JsonHeader, JsonSolutionsReader<R>), ResultsParseError> {
    let mut parser = ReaderJsonParser::new(source);
    expect(&mut parser, JsonEvent::StartObject)?;
    let mut variables = Vec::new();
    loop {
        match next(&mut parser)? {
            JsonEvent::ObjectKey(key) if key.as_ref() == "head" => {
                expect(&mut parser, JsonEvent::StartObject)?;
                loop {
                    match next(&mut parser)? {
                        JsonEvent::ObjectKey(key) if key.as_ref() == "vars" => {
                            expect(&mut parser, JsonEvent::StartArray)?;
                            loop {
                                match next(&mut parser)? {
                                    JsonEvent::String(name) => {
                                        variables.push(Variable::new(name.into_owned()).map_err(|e| syntax_error(e.to_string()))?);
                                    }
                                    JsonEvent::EndArray => break,
                                    other => return Err(unexpected(other)),
                                }
                            }
                        }
                        JsonEvent::ObjectKey(_) => skip_value(&mut parser)?,
                        JsonEvent::EndObject => break,
                        other => return Err(unexpected(other)),
                    }
                }
            }
            JsonEvent::ObjectKey(key) if key.as_ref() == "boolean" => {
                let JsonEvent::Boolean(value) = next(&mut parser)? else {
                    return Err(syntax_error("expected a boolean value".to_owned()));
                };
                return Ok((JsonHeader::Boolean(value), JsonSolutionsReader { parser, done: true }));
            }
            JsonEvent::ObjectKey(key) if key.as_ref() == "results" => {
                expect(&mut parser, JsonEvent::StartObject)?;
                expect(&mut parser, JsonEvent::ObjectKey("bindings".into()))?;
                expect(&mut parser, JsonEvent::StartArray)?;
                return Ok((JsonHeader::Solutions(variables), JsonSolutionsReader { parser, done: false }));
            }
            JsonEvent::ObjectKey(_) => skip_value(&mut parser)?,
            JsonEvent::EndObject => return Err(syntax_error("missing results/boolean key".to_owned())),
            other => return Err(unexpected(other)),
        }
    }
}

pub struct JsonSolutionsReader<R: Read> {
    parser: ReaderJsonParser<R>,
    done: bool,
}

impl<R: Read> JsonSolutionsReader<R> {
    pub fn read_next(&mut self) -> Result<Option<HashMap<String, Term>>, ResultsParseError> {
        if self.done {
            return Ok(None);
        }
        match next(&mut self.parser)? {
            JsonEvent::EndArray => {
                self.done = true;
                Ok(None)
            }
            JsonEvent::StartObject => {
                let mut bindings = HashMap::new();
                loop {
                    match next(&mut self.parser)? {
                        JsonEvent::ObjectKey(name) => {
                            let name = name.into_owned();
                            let term = self.read_term()?;
                            bindings.insert(name, term);
                        }
                        JsonEvent::EndObject => return Ok(Some(bindings)),
                        other => return Err(unexpected(other)),
                    }
                }
            }
            other => Err(unexpected(other)),
        }
    }

    fn read_term(&mut self) -> Result<Term, ResultsParseError> {
        expect(&mut self.parser, JsonEvent::StartObject)?;
        let mut kind = None;
        let mut value = None;
        let mut lang = None;
        let mut datatype = None;
        loop {
            match next(&mut self.parser)? {
                JsonEvent::ObjectKey(key) => {
                    let key = key.into_owned();
                    let JsonEvent::String(s) = next(&mut self.parser)? else {
                        return Err(syntax_error("expected a string value in a term object".to_owned()));
                    };
                    match key.as_str() {
                        "type" => kind = Some(s.into_owned()),
                        "value" => value = Some(s.into_owned()),
                        "xml:lang" => lang = Some(s.into_owned()),
                        "datatype" => datatype = Some(s.into_owned()),
                        _ => {}
                    }
                }
                JsonEvent::EndObject => break,
                other => return Err(unexpected(other)),
            }
        }
        let kind = kind.ok_or_else(|| syntax_error("term object missing \"type\"".to_owned()))?;
        let value = value.ok_or_else(|| syntax_error("term object missing \"value\"".to_owned()))?;
        match kind.as_str() {
            "uri" => Ok(Term::NamedNode(NamedNode::new(value).map_err(|e| syntax_error(e.to_string()))?)),
            "bnode" => Ok(Term::BlankNode(BlankNode::new(value).map_err(|e| syntax_error(e.to_string()))?)),
            "literal" | "typed-literal" => Ok(Term::Literal(if let Some(lang) = lang {
                Literal::new_lang_tagged(value, lang).map_err(|e| syntax_error(e.to_string()))?
            } else if let Some(datatype) = datatype {
                Literal::new_typed(value, NamedNode::new(datatype).map_err(|e| syntax_error(e.to_string()))?)
            } else {
                Literal::new_simple(value)
            })),
            other => Err(syntax_error(format!("unknown term type {other:?}"))),
        }
    }
}

fn next<R: Read>(parser: &mut ReaderJsonParser<R>) -> Result<JsonEvent<'_>, ResultsParseError> {
    parser.parse_next().map_err(|e| syntax_error(e.to_string()))
}

fn expect<R: Read>(parser: &mut ReaderJsonParser<R>, expected: JsonEvent<'static>) -> Result<(), ResultsParseError> {
    let event = next(parser)?;
    if event == expected {
        Ok(())
    } else {
        Err(unexpected(event))
    }
}

fn skip_value<R: Read>(parser: &mut ReaderJsonParser<R>) -> Result<(), ResultsParseError> {
    let mut depth = 0i32;
    loop {
        match next(parser)? {
            JsonEvent::StartObject | JsonEvent::StartArray => depth += 1,
            JsonEvent::EndObject | JsonEvent::EndArray => {
                depth -= 1;
                if depth <= 0 {
                    return Ok(());
                }
            }
            _ if depth == 0 => return Ok(()),
            _ => {}
        }
    }
}

fn unexpected(event: JsonEvent<'_>) -> ResultsParseError {
    syntax_error(format!("unexpected JSON token {event:?}"))
}

fn syntax_error(message: String) -> ResultsParseError {
    ResultsParseError::Syntax { format: "json", message }
}
