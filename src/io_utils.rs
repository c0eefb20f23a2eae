//! Input opening, encoding and delimiter resolution.
//!
//! - **Paths**: the `-` path convention routes through stdin; anything else
//!   must be an existing regular file.
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` →
//!   comma, `.tsv` → tab) with manual override support.
//! - **Encoding**: CSV input decoding via `encoding_rs`, defaulting to UTF-8.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8};

use crate::error::LoadError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// Opens the feed for reading. A missing or non-file path is a configuration
/// problem, not a runtime failure.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, LoadError> {
    if is_dash(path) {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    if !path.is_file() {
        return Err(LoadError::config(format!(
            "input path {path:?} does not exist or is not a file"
        )));
    }
    let file = File::open(path)
        .map_err(|err| LoadError::config(format!("failed to open input file {path:?}: {err}")))?;
    Ok(Box::new(BufReader::new(file)))
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, LoadError> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| LoadError::config(format!("unknown encoding '{value}'")))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String, LoadError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(LoadError::parse(format!(
            "failed to decode text with encoding {}",
            encoding.name()
        )))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<String>, LoadError> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}
