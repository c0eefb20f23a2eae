//! Delimited-text feed parser.
//!
//! The header row supplies field names, every data row is one record and the
//! table is named after the input's file stem.

use std::io::BufRead;

use encoding_rs::Encoding;
use log::debug;

use super::{Feed, RecordParser};
use crate::{
    error::LoadError,
    io_utils,
    record::{Record, TableIdentifier},
};

#[derive(Debug, Clone, Copy)]
pub struct CsvParser {
    delimiter: u8,
    encoding: &'static Encoding,
}

impl CsvParser {
    pub fn new(delimiter: u8, encoding: &'static Encoding) -> Self {
        Self {
            delimiter,
            encoding,
        }
    }
}

impl RecordParser for CsvParser {
    fn parse(&self, source_name: &str, input: Box<dyn BufRead>) -> Result<Feed, LoadError> {
        let table = TableIdentifier::sanitize(source_name)?;
        let mut reader = io_utils::open_csv_reader(input, self.delimiter);
        let header_record = reader
            .byte_headers()
            .map_err(|err| LoadError::parse(format!("failed to read CSV header: {err}")))?
            .clone();
        if header_record.is_empty() {
            return Err(LoadError::parse("CSV input is empty"));
        }
        let headers = field_names(io_utils::decode_record(&header_record, self.encoding)?);
        debug!("CSV header for table '{table}': {headers:?}");

        let encoding = self.encoding;
        let mut rows = reader
            .into_byte_records()
            .enumerate()
            .map(move |(idx, row)| -> Result<Record, LoadError> {
                let row = row.map_err(|err| {
                    LoadError::parse(format!("failed to read CSV row {}: {err}", idx + 2))
                })?;
                let values = io_utils::decode_record(&row, encoding)?;
                Ok(headers.iter().cloned().zip(values).collect::<Record>())
            });
        let first = rows
            .next()
            .transpose()?
            .ok_or_else(|| LoadError::parse("CSV input has a header but no data rows"))?;
        Ok(Feed::new(table, first, Box::new(rows)))
    }
}

/// Blank header cells are named `field_<index>` after their position.
fn field_names(headers: Vec<String>) -> Vec<String> {
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                format!("field_{idx}")
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}
