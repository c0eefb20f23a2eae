//! Turning raw feed bytes into a table identifier plus a stream of records.
//!
//! Each supported [`FileFormat`] has one [`RecordParser`]. Parsers read the
//! root container and the first record eagerly (a feed without records is a
//! parse error); the remaining records are pulled lazily by the loader.

pub mod csv;
pub mod xml;

use std::{
    io::{BufRead, Cursor},
    iter,
    path::Path,
    str::FromStr,
};

use encoding_rs::Encoding;

use crate::{
    error::LoadError,
    io_utils,
    record::{Record, TableIdentifier},
};

pub use self::csv::CsvParser;
pub use self::xml::XmlParser;

/// Remaining records of a feed. Finite and consumed exactly once.
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, LoadError>>>;

pub struct Feed {
    table: TableIdentifier,
    first: Record,
    rest: RecordStream,
}

impl Feed {
    pub fn new(table: TableIdentifier, first: Record, rest: RecordStream) -> Self {
        Self { table, first, rest }
    }

    pub fn table(&self) -> &TableIdentifier {
        &self.table
    }

    /// The record whose field order and values define the inferred schema.
    pub fn first_record(&self) -> &Record {
        &self.first
    }

    /// Every record, starting with the first one.
    pub fn into_records(self) -> impl Iterator<Item = Result<Record, LoadError>> {
        iter::once(Ok(self.first)).chain(self.rest)
    }
}

pub trait RecordParser {
    /// `source_name` names the input (usually the file stem) for formats whose
    /// content carries no collection name of its own.
    fn parse(&self, source_name: &str, input: Box<dyn BufRead>) -> Result<Feed, LoadError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Xml,
    Csv {
        delimiter: u8,
        encoding: &'static Encoding,
    },
}

impl FileFormat {
    /// Picks the format from the file extension. `format` overrides the
    /// extension (required when reading stdin).
    pub fn detect(
        path: &Path,
        format: Option<&str>,
        delimiter: Option<u8>,
        encoding: Option<&str>,
    ) -> Result<Self, LoadError> {
        let kind = match format {
            Some(name) => FormatKind::from_str(name)?,
            None => {
                let ext = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .ok_or_else(|| {
                        LoadError::config(format!(
                            "cannot determine the file type of {path:?}; pass --format"
                        ))
                    })?;
                FormatKind::from_str(ext)?
            }
        };
        Ok(match kind {
            FormatKind::Xml => FileFormat::Xml,
            FormatKind::Csv => FileFormat::Csv {
                delimiter: io_utils::resolve_input_delimiter(path, delimiter),
                encoding: io_utils::resolve_encoding(encoding)?,
            },
        })
    }

    pub fn parse(&self, source_name: &str, input: Box<dyn BufRead>) -> Result<Feed, LoadError> {
        match self {
            FileFormat::Xml => XmlParser.parse(source_name, input),
            FileFormat::Csv {
                delimiter,
                encoding,
            } => CsvParser::new(*delimiter, *encoding).parse(source_name, input),
        }
    }

    pub fn parse_bytes(&self, source_name: &str, content: Vec<u8>) -> Result<Feed, LoadError> {
        self.parse(source_name, Box::new(Cursor::new(content)))
    }
}

enum FormatKind {
    Xml,
    Csv,
}

impl FromStr for FormatKind {
    type Err = LoadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "xml" => Ok(FormatKind::Xml),
            "csv" | "tsv" => Ok(FormatKind::Csv),
            other => Err(LoadError::config(format!(
                "unsupported file type '{other}' (expected xml, csv or tsv)"
            ))),
        }
    }
}
