//! Full-row duplicate detection.
//!
//! A candidate row is a duplicate only when some stored row holds the same
//! value in every column the candidate carries. There is no key-based
//! shortcut: two rows differing in any single value are distinct.

use crate::{
    error::LoadError,
    record::TableIdentifier,
    store::{Row, SchemaStore},
};

pub fn is_duplicate<S: SchemaStore>(
    store: &S,
    table: &TableIdentifier,
    row: &Row,
) -> Result<bool, LoadError> {
    store
        .row_exists(table, row)
        .map_err(|source| LoadError::Lookup {
            table: table.to_string(),
            source,
        })
}
