//! Brings a stored table in line with an inferred schema, additively.
//!
//! An absent table is created from the inferred columns (behind a synthetic
//! auto-increment key). A present table only ever gains the inferred columns
//! it lacks, compared case-insensitively; existing columns are never removed
//! or retyped. Column additions are not transactional: a failure part-way
//! leaves the columns added so far in place.

use log::info;
use serde::Serialize;

use crate::{
    error::LoadError,
    infer::{ColumnSpec, InferredSchema},
    record::TableIdentifier,
    store::SchemaStore,
};

/// Name of the synthetic primary key prepended to created tables.
pub const PRIMARY_KEY_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchemaChange {
    Created { columns: Vec<ColumnSpec> },
    Extended { added: Vec<ColumnSpec> },
    Unchanged,
}

pub fn reconcile<S: SchemaStore>(
    store: &mut S,
    table: &TableIdentifier,
    inferred: &InferredSchema,
) -> Result<SchemaChange, LoadError> {
    if let Some(column) = inferred.column(PRIMARY_KEY_COLUMN) {
        return Err(LoadError::SchemaRejected {
            table: table.to_string(),
            reason: format!(
                "field '{}' collides with the generated primary key column",
                column.name
            ),
        });
    }

    let schema_error = |source| LoadError::Schema {
        table: table.to_string(),
        source,
    };

    let exists = store
        .list_tables()
        .map_err(schema_error)?
        .iter()
        .any(|name| table.matches(name));
    let existing = if exists {
        store.describe_table(table).map_err(schema_error)?
    } else {
        None
    };

    let Some(existing) = existing else {
        let mut columns = Vec::with_capacity(inferred.columns.len() + 1);
        columns.push(ColumnSpec::primary_key(PRIMARY_KEY_COLUMN));
        columns.extend(inferred.columns.iter().cloned());
        store.create_table(table, &columns).map_err(schema_error)?;
        info!(
            "Created table '{table}' with {} column(s)",
            inferred.columns.len()
        );
        return Ok(SchemaChange::Created { columns });
    };

    let missing: Vec<ColumnSpec> = inferred
        .columns
        .iter()
        .filter(|column| !existing.has_column(&column.name))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(SchemaChange::Unchanged);
    }
    for column in &missing {
        store.add_column(table, column).map_err(schema_error)?;
        info!(
            "Added column '{}' ({}) to table '{table}'",
            column.name, column.column_type
        );
    }
    Ok(SchemaChange::Extended { added: missing })
}
