//! Bulk loader: infer, reconcile, then insert every record not already stored.
//!
//! The loader owns no connection of its own; it drives whatever
//! [`SchemaStore`] its caller hands it. Stages run strictly in order and the
//! schema is final before the first insert. Any store failure ends the run;
//! rows inserted earlier in the same run stay inserted.

use log::{debug, info};
use serde::Serialize;

use crate::{
    dedup,
    error::LoadError,
    infer::InferredSchema,
    parser::Feed,
    reconcile::{self, SchemaChange},
    record::{Record, TableIdentifier},
    store::{Row, SchemaStore, TableSchema},
};

pub const IMPORTED_MESSAGE: &str = "Table and data imported successfully.";
pub const NO_NEW_DATA_MESSAGE: &str = "Data already exists; no new rows were imported.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: TableIdentifier,
    pub schema_change: SchemaChange,
    pub inserted: u64,
    pub skipped: u64,
}

/// Both variants are successful runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(u64),
    NoNewData,
}

impl ImportOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ImportOutcome::Imported(_) => IMPORTED_MESSAGE,
            ImportOutcome::NoNewData => NO_NEW_DATA_MESSAGE,
        }
    }
}

impl LoadReport {
    pub fn outcome(&self) -> ImportOutcome {
        if self.inserted > 0 {
            ImportOutcome::Imported(self.inserted)
        } else {
            ImportOutcome::NoNewData
        }
    }
}

pub struct FeedLoader<S> {
    store: S,
}

impl<S: SchemaStore> FeedLoader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn load(&mut self, feed: Feed) -> Result<LoadReport, LoadError> {
        let table = feed.table().clone();
        let inferred = InferredSchema::from_record(feed.first_record());
        let schema_change = reconcile::reconcile(&mut self.store, &table, &inferred)?;

        let schema = self
            .store
            .describe_table(&table)
            .map_err(|source| LoadError::Schema {
                table: table.to_string(),
                source,
            })?
            .ok_or_else(|| LoadError::SchemaRejected {
                table: table.to_string(),
                reason: "table is missing after reconciliation".to_string(),
            })?;

        let (inserted, skipped) = self.insert_records(&table, &schema, feed.into_records())?;
        info!("Table '{table}': {inserted} row(s) inserted, {skipped} duplicate(s) skipped");
        Ok(LoadReport {
            table,
            schema_change,
            inserted,
            skipped,
        })
    }

    /// Inserts each record that has no full-row match in `table`, returning
    /// the inserted and skipped counts.
    pub fn insert_records<I>(
        &mut self,
        table: &TableIdentifier,
        schema: &TableSchema,
        records: I,
    ) -> Result<(u64, u64), LoadError>
    where
        I: IntoIterator<Item = Result<Record, LoadError>>,
    {
        let mut inserted = 0u64;
        let mut skipped = 0u64;
        for (idx, record) in records.into_iter().enumerate() {
            let record = record?;
            let row = narrow(&record, schema);
            if dedup::is_duplicate(&self.store, table, &row)? {
                debug!("Record {} already present in '{table}'; skipping", idx + 1);
                skipped += 1;
                continue;
            }
            self.store
                .insert_row(table, &row)
                .map_err(|source| LoadError::Insert {
                    table: table.to_string(),
                    record: idx + 1,
                    source,
                })?;
            inserted += 1;
        }
        Ok((inserted, skipped))
    }
}

/// Keeps the record's fields that name a writable column of `schema`,
/// coerced to that column's type and spelled as the store spells it.
pub fn narrow(record: &Record, schema: &TableSchema) -> Row {
    let mut row = Row::with_capacity(record.len());
    for (field, raw) in record.iter() {
        match schema.data_columns().find(|column| column.matches(field)) {
            Some(column) => row.push((column.name.clone(), column.column_type.coerce(raw))),
            None => debug!("Dropping field '{field}' with no matching column"),
        }
    }
    row
}
