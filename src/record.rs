//! Flat records produced by the parsers and the identifiers derived from them.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::LoadError;

/// One input item: field name to raw scalar text, in document order.
///
/// Field identity is case-insensitive; a repeated field keeps the value of
/// its first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, returning `false` when a field with the same name
    /// (ignoring case) is already present.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.fields.push((name, value.into()));
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for Record
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.push(name, value);
        }
        record
    }
}

/// A typed cell ready to be bound into a store statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    /// Feed text that does not fit its numeric column. Stored byte for byte
    /// so the column's affinity cannot turn `"20 "` into `20`.
    Raw(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) | Value::Raw(s) => f.write_str(s),
        }
    }
}

/// Table name derived from the feed's root element (or file stem).
///
/// Always matches `[A-Za-z0-9_]+`: every other character is replaced by a
/// single `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TableIdentifier(String);

impl TableIdentifier {
    pub fn sanitize(raw: &str) -> Result<Self, LoadError> {
        if raw.is_empty() {
            return Err(LoadError::parse("cannot derive a table name from an empty root name"));
        }
        let sanitized = raw
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => c,
                _ => '_',
            })
            .collect();
        Ok(Self(sanitized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table names are matched the way the store matches them: ignoring case.
    pub fn matches(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
