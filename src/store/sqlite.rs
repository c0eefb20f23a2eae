//! [`SchemaStore`] backed by a SQLite database file.

use std::{path::Path, time::Duration};

use itertools::Itertools;
use log::debug;
use rusqlite::{
    Connection, params, params_from_iter,
    types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
};

use super::{SchemaStore, StoreError, TableSchema};
use crate::{
    infer::{ColumnSpec, ColumnType},
    record::{TableIdentifier, Value},
};

const BUSY_TIMEOUT_MS: u64 = 5_000;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn row_count(&self, table: &TableIdentifier) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table.as_str()));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Releases the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, err)| StoreError::from(err))
    }
}

impl SchemaStore for SqliteStore {
    fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn describe_table(&self, table: &TableIdentifier) -> Result<Option<TableSchema>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table.as_str()], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                let pk: i64 = row.get(2)?;
                Ok(if pk > 0 {
                    ColumnSpec::primary_key(name)
                } else {
                    ColumnSpec::new(name, ColumnType::from_declared(&declared))
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(TableSchema { columns }))
    }

    fn create_table(
        &mut self,
        table: &TableIdentifier,
        columns: &[ColumnSpec],
    ) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE {} ({})",
            quote_ident(table.as_str()),
            columns.iter().map(column_definition).join(", ")
        );
        debug!("{sql}");
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn add_column(
        &mut self,
        table: &TableIdentifier,
        column: &ColumnSpec,
    ) -> Result<(), StoreError> {
        if column.primary_key {
            return Err(StoreError::Rejected(format!(
                "cannot add primary key column '{}' to an existing table",
                column.name
            )));
        }
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_ident(table.as_str()),
            column_definition(column)
        );
        debug!("{sql}");
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn row_exists(
        &self,
        table: &TableIdentifier,
        predicate: &[(String, Value)],
    ) -> Result<bool, StoreError> {
        let mut sql = format!("SELECT EXISTS(SELECT 1 FROM {}", quote_ident(table.as_str()));
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(
                &predicate
                    .iter()
                    .enumerate()
                    .map(|(idx, (column, _))| format!("{} IS ?{}", quote_ident(column), idx + 1))
                    .join(" AND "),
            );
        }
        sql.push(')');
        let exists = self.conn.query_row(
            &sql,
            params_from_iter(predicate.iter().map(|(_, value)| value)),
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    fn insert_row(
        &mut self,
        table: &TableIdentifier,
        row: &[(String, Value)],
    ) -> Result<(), StoreError> {
        let sql = if row.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table.as_str()))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table.as_str()),
                row.iter().map(|(column, _)| quote_ident(column)).join(", "),
                (1..=row.len()).map(|idx| format!("?{idx}")).join(", ")
            )
        };
        self.conn
            .execute(&sql, params_from_iter(row.iter().map(|(_, value)| value)))?;
        Ok(())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            // Bound as text so SQLite applies the column's numeric affinity
            // identically on insert and on comparison.
            Value::Decimal(d) => ToSqlOutput::Owned(SqlValue::Text(d.to_string())),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            // Blobs bypass INTEGER and NUMERIC affinity, on insert and under `IS`.
            Value::Raw(s) => ToSqlOutput::Borrowed(ValueRef::Blob(s.as_bytes())),
        })
    }
}

fn column_definition(column: &ColumnSpec) -> String {
    if column.primary_key {
        format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(&column.name))
    } else {
        format!(
            "{} {}",
            quote_ident(&column.name),
            column.column_type.sql_type()
        )
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
