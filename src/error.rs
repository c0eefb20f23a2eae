//! Error taxonomy shared by every stage of an import.
//!
//! Each stage surfaces its failure unchanged; only the command shell turns a
//! [`LoadError`] into a log line and an exit code.

use std::process::ExitCode;

use thiserror::Error;

use crate::store::StoreError;

/// Process exit code for any failure that is not a configuration problem.
pub const EXIT_UNSPECIFIED_ERROR: u8 = 1;
/// Process exit code for a missing/invalid input path or unsupported type.
pub const EXIT_CONFIG: u8 = 78;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse feed: {0}")]
    Parse(String),

    #[error("schema change on table '{table}' failed: {source}")]
    Schema {
        table: String,
        #[source]
        source: StoreError,
    },

    /// The reconciler refused the inferred schema before touching the store.
    #[error("schema of table '{table}' rejected: {reason}")]
    SchemaRejected { table: String, reason: String },

    #[error("duplicate lookup on table '{table}' failed: {source}")]
    Lookup {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("insert into table '{table}' failed at record {record}: {source}")]
    Insert {
        table: String,
        record: usize,
        #[source]
        source: StoreError,
    },
}

impl LoadError {
    pub fn config(message: impl Into<String>) -> Self {
        LoadError::Config(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        LoadError::Parse(message.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, LoadError::Config(_))
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_config() {
            ExitCode::from(EXIT_CONFIG)
        } else {
            ExitCode::from(EXIT_UNSPECIFIED_ERROR)
        }
    }
}
