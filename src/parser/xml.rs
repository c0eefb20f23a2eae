//! Streaming XML feed parser.
//!
//! The document root names the table. Its element children are the records;
//! the element name of the first child fixes the record name and children
//! with any other name are skipped. Each child element of a record is one
//! field whose value is its text content, kept verbatim (entities resolved,
//! CDATA included, no trimming). Attributes are ignored.

use std::io::BufRead;

use log::debug;
use quick_xml::{Reader, events::Event};

use super::{Feed, RecordParser};
use crate::{
    error::LoadError,
    record::{Record, TableIdentifier},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser;

impl RecordParser for XmlParser {
    fn parse(&self, _source_name: &str, input: Box<dyn BufRead>) -> Result<Feed, LoadError> {
        let mut records = XmlRecords::new(input);
        let root = records.open_root()?;
        let table = TableIdentifier::sanitize(&root)?;
        let first = records.next().transpose()?.ok_or_else(|| {
            LoadError::parse(format!("root element <{root}> contains no record elements"))
        })?;
        debug!("Feed root <{root}> maps to table '{table}'");
        Ok(Feed::new(table, first, Box::new(records)))
    }
}

/// Owned view of the reader events the record walker cares about.
enum Token {
    Open(String),
    Empty(String),
    Close,
    Text(String),
    Eof,
}

struct XmlRecords {
    reader: Reader<Box<dyn BufRead>>,
    buf: Vec<u8>,
    record_name: Option<String>,
    done: bool,
}

impl XmlRecords {
    fn new(input: Box<dyn BufRead>) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            buf: Vec::new(),
            record_name: None,
            done: false,
        }
    }

    fn next_token(&mut self) -> Result<Token, LoadError> {
        loop {
            self.buf.clear();
            let token = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => Token::Open(element_name(e.local_name().as_ref())),
                Ok(Event::Empty(e)) => Token::Empty(element_name(e.local_name().as_ref())),
                Ok(Event::End(_)) => Token::Close,
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| {
                        LoadError::parse(format!(
                            "invalid character data near byte {}: {err}",
                            self.reader.buffer_position()
                        ))
                    })?;
                    Token::Text(text.into_owned())
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8(e.into_inner().into_owned()).map_err(|err| {
                        LoadError::parse(format!(
                            "invalid CDATA section near byte {}: {err}",
                            self.reader.buffer_position()
                        ))
                    })?;
                    Token::Text(text)
                }
                Ok(Event::Eof) => Token::Eof,
                Ok(_) => continue,
                Err(err) => {
                    return Err(LoadError::parse(format!(
                        "malformed XML near byte {}: {err}",
                        self.reader.buffer_position()
                    )));
                }
            };
            return Ok(token);
        }
    }

    fn open_root(&mut self) -> Result<String, LoadError> {
        loop {
            match self.next_token()? {
                Token::Open(name) => return Ok(name),
                Token::Empty(name) => {
                    return Err(LoadError::parse(format!(
                        "root element <{name}> contains no record elements"
                    )));
                }
                Token::Text(text) if text.trim().is_empty() => continue,
                Token::Text(_) => {
                    return Err(LoadError::parse("text content outside of the root element"));
                }
                Token::Close => {
                    return Err(LoadError::parse("closing tag before the root element"));
                }
                Token::Eof => return Err(LoadError::parse("document is empty")),
            }
        }
    }

    fn read_record(&mut self) -> Result<Option<Record>, LoadError> {
        loop {
            match self.next_token()? {
                Token::Open(name) => {
                    if self.accepts(&name) {
                        return self.read_fields(&name).map(Some);
                    }
                    debug!("Skipping <{name}> element between records");
                    self.skip_element()?;
                }
                Token::Empty(name) => {
                    if self.accepts(&name) {
                        return Ok(Some(Record::new()));
                    }
                }
                Token::Text(_) => continue,
                Token::Close => {
                    self.done = true;
                    self.finish_document()?;
                    return Ok(None);
                }
                Token::Eof => {
                    return Err(LoadError::parse(
                        "document ended before the root element was closed",
                    ));
                }
            }
        }
    }

    /// Consumes the epilogue after the root's closing tag. Only whitespace,
    /// comments and processing instructions may follow it.
    fn finish_document(&mut self) -> Result<(), LoadError> {
        loop {
            match self.next_token()? {
                Token::Eof => return Ok(()),
                Token::Text(text) if text.trim().is_empty() => continue,
                Token::Text(_) => {
                    return Err(LoadError::parse("text content after the root element"));
                }
                Token::Open(name) | Token::Empty(name) => {
                    return Err(LoadError::parse(format!(
                        "extra content at the end of the document: <{name}>"
                    )));
                }
                Token::Close => {
                    return Err(LoadError::parse("closing tag after the root element"));
                }
            }
        }
    }

    fn accepts(&mut self, name: &str) -> bool {
        match &self.record_name {
            Some(expected) => expected == name,
            None => {
                self.record_name = Some(name.to_string());
                true
            }
        }
    }

    fn read_fields(&mut self, record_name: &str) -> Result<Record, LoadError> {
        let mut record = Record::new();
        loop {
            let (field, value) = match self.next_token()? {
                Token::Open(field) => {
                    let value = self.read_text()?;
                    (field, value)
                }
                Token::Empty(field) => (field, String::new()),
                Token::Text(_) => continue,
                Token::Close => return Ok(record),
                Token::Eof => {
                    return Err(LoadError::parse(format!(
                        "document ended inside <{record_name}>"
                    )));
                }
            };
            if !record.push(field.as_str(), value) {
                debug!("Ignoring repeated field <{field}> in <{record_name}>");
            }
        }
    }

    /// Collects the text of the current element, descending into any nested
    /// elements, up to its closing tag.
    fn read_text(&mut self) -> Result<String, LoadError> {
        let mut text = String::new();
        let mut depth = 1usize;
        loop {
            match self.next_token()? {
                Token::Text(chunk) => text.push_str(&chunk),
                Token::Open(_) => depth += 1,
                Token::Empty(_) => {}
                Token::Close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                }
                Token::Eof => return Err(LoadError::parse("document ended inside a field")),
            }
        }
    }

    fn skip_element(&mut self) -> Result<(), LoadError> {
        self.read_text().map(|_| ())
    }
}

impl Iterator for XmlRecords {
    type Item = Result<Record, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
