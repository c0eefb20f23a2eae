//! Capability interface to the relational store that owns table state.
//!
//! The import engine never reaches for a global connection: a [`SchemaStore`]
//! is handed to the loader by its caller, who also decides when it is opened
//! and released.

pub mod sqlite;

use thiserror::Error;

use crate::{
    infer::ColumnSpec,
    record::{TableIdentifier, Value},
};

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    Rejected(String),
}

/// Current column set of a stored table, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.matches(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Columns a feed may write, i.e. everything except the synthetic key.
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|column| !column.primary_key)
    }
}

/// A record narrowed to stored columns and coerced into their types. Column
/// names are the store's spelling.
pub type Row = Vec<(String, Value)>;

pub trait SchemaStore {
    fn list_tables(&self) -> Result<Vec<String>, StoreError>;

    /// `None` when the table does not exist.
    fn describe_table(&self, table: &TableIdentifier) -> Result<Option<TableSchema>, StoreError>;

    fn create_table(
        &mut self,
        table: &TableIdentifier,
        columns: &[ColumnSpec],
    ) -> Result<(), StoreError>;

    fn add_column(
        &mut self,
        table: &TableIdentifier,
        column: &ColumnSpec,
    ) -> Result<(), StoreError>;

    /// Whether a stored row equals `predicate` on every listed column. NULL
    /// compares equal to NULL.
    fn row_exists(
        &self,
        table: &TableIdentifier,
        predicate: &[(String, Value)],
    ) -> Result<bool, StoreError>;

    fn insert_row(
        &mut self,
        table: &TableIdentifier,
        row: &[(String, Value)],
    ) -> Result<(), StoreError>;
}

impl<S: SchemaStore + ?Sized> SchemaStore for &mut S {
    fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        (**self).list_tables()
    }

    fn describe_table(&self, table: &TableIdentifier) -> Result<Option<TableSchema>, StoreError> {
        (**self).describe_table(table)
    }

    fn create_table(
        &mut self,
        table: &TableIdentifier,
        columns: &[ColumnSpec],
    ) -> Result<(), StoreError> {
        (**self).create_table(table, columns)
    }

    fn add_column(
        &mut self,
        table: &TableIdentifier,
        column: &ColumnSpec,
    ) -> Result<(), StoreError> {
        (**self).add_column(table, column)
    }

    fn row_exists(
        &self,
        table: &TableIdentifier,
        predicate: &[(String, Value)],
    ) -> Result<bool, StoreError> {
        (**self).row_exists(table, predicate)
    }

    fn insert_row(
        &mut self,
        table: &TableIdentifier,
        row: &[(String, Value)],
    ) -> Result<(), StoreError> {
        (**self).insert_row(table, row)
    }
}
