//! Column type inference and value coercion.
//!
//! Types come from a single sample value (the first record's): a full signed
//! integer literal is `Integer`, a full decimal literal is `Decimal`, anything
//! else is `Text`. Later values are coerced into the column's type when they
//! fit and are kept as raw bytes when they do not.

use std::{fmt, str::FromStr, sync::OnceLock};

use log::debug;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::record::{Record, Value};

/// Fractional digits kept by a `DECIMAL(10,4)` column.
pub const DECIMAL_SCALE: u32 = 4;
pub const DECIMAL_PRECISION: u32 = 10;

static INTEGER_LITERAL: OnceLock<Regex> = OnceLock::new();
static DECIMAL_LITERAL: OnceLock<Regex> = OnceLock::new();

fn integer_literal() -> &'static Regex {
    INTEGER_LITERAL.get_or_init(|| Regex::new(r"^[+-]?[0-9]+$").expect("valid integer pattern"))
}

fn decimal_literal() -> &'static Regex {
    DECIMAL_LITERAL.get_or_init(|| {
        Regex::new(r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+)$").expect("valid decimal pattern")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Integer,
    Decimal,
    Text,
}

impl ColumnType {
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Decimal => format!("DECIMAL({DECIMAL_PRECISION},{DECIMAL_SCALE})"),
            ColumnType::Text => "TEXT".to_string(),
        }
    }

    /// Maps a declared store type back to a bucket. Unknown declarations are
    /// treated as text.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper == "INTEGER" || upper == "INT" || upper == "BIGINT" {
            ColumnType::Integer
        } else if upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC") {
            ColumnType::Decimal
        } else {
            ColumnType::Text
        }
    }

    /// Converts raw feed text into a bindable value for a column of this type.
    pub fn coerce(&self, raw: &str) -> Value {
        if raw.is_empty() {
            return Value::Null;
        }
        match self {
            ColumnType::Integer => match parse_integer(raw) {
                Some(i) => Value::Integer(i),
                None => {
                    debug!("Value '{raw}' does not fit an INTEGER column; storing it raw");
                    Value::Raw(raw.to_string())
                }
            },
            ColumnType::Decimal => match parse_decimal(raw) {
                Some(d) => Value::Decimal(round_to_scale(d)),
                None => {
                    debug!("Value '{raw}' does not fit a DECIMAL column; storing it raw");
                    Value::Raw(raw.to_string())
                }
            },
            ColumnType::Text => Value::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_type())
    }
}

pub fn infer_type(value: &str) -> ColumnType {
    if parse_integer(value).is_some() {
        ColumnType::Integer
    } else if parse_decimal(value).is_some() {
        ColumnType::Decimal
    } else {
        ColumnType::Text
    }
}

fn parse_integer(value: &str) -> Option<i64> {
    if !integer_literal().is_match(value) {
        return None;
    }
    value.parse().ok()
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    if !decimal_literal().is_match(value) && !integer_literal().is_match(value) {
        return None;
    }
    let (negative, digits) = match value.as_bytes()[0] {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };
    let digits = digits.strip_suffix('.').unwrap_or(digits);
    let mut normalized = String::with_capacity(digits.len() + 2);
    if negative {
        normalized.push('-');
    }
    if digits.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(digits);
    Decimal::from_str(&normalized).ok()
}

/// Rounds half away from zero to [`DECIMAL_SCALE`] digits and pads to exactly
/// that many, so `41.6` and `41.60004` both become `41.6000`.
pub fn round_to_scale(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(DECIMAL_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DECIMAL_SCALE);
    rounded
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
        }
    }

    /// Auto-incrementing integer key prepended to every created table.
    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Integer,
            primary_key: true,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Column set inferred from one sample record, in its field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSchema {
    pub columns: Vec<ColumnSpec>,
}

impl InferredSchema {
    pub fn from_record(record: &Record) -> Self {
        let columns = record
            .iter()
            .map(|(name, value)| ColumnSpec::new(name, infer_type(value)))
            .collect();
        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_type_buckets_values() {
        assert_eq!(infer_type("20"), ColumnType::Integer);
        assert_eq!(infer_type("-340"), ColumnType::Integer);
        assert_eq!(infer_type("+7"), ColumnType::Integer);
        assert_eq!(infer_type("41.6000"), ColumnType::Decimal);
        assert_eq!(infer_type("-.5"), ColumnType::Decimal);
        assert_eq!(infer_type("3."), ColumnType::Decimal);
        assert_eq!(infer_type("No"), ColumnType::Text);
        assert_eq!(infer_type("Caffeinated"), ColumnType::Text);
    }

    #[test]
    fn infer_type_requires_the_whole_value_to_be_numeric() {
        assert_eq!(infer_type(" 20"), ColumnType::Text);
        assert_eq!(infer_type("20 "), ColumnType::Text);
        assert_eq!(infer_type("1e5"), ColumnType::Text);
        assert_eq!(infer_type("1,000"), ColumnType::Text);
        assert_eq!(infer_type(""), ColumnType::Text);
        assert_eq!(infer_type("."), ColumnType::Text);
        assert_eq!(infer_type("-"), ColumnType::Text);
    }

    #[test]
    fn integers_beyond_i64_are_not_integers() {
        assert_eq!(infer_type("99999999999999999999"), ColumnType::Decimal);
        assert_eq!(
            infer_type("999999999999999999999999999999999"),
            ColumnType::Text
        );
    }

    #[test]
    fn decimals_round_half_away_from_zero_to_four_places() {
        let coerce = |raw: &str| ColumnType::Decimal.coerce(raw).to_string();
        assert_eq!(coerce("41.6"), "41.6000");
        assert_eq!(coerce("41.6000"), "41.6000");
        assert_eq!(coerce("1.23444"), "1.2344");
        assert_eq!(coerce("1.23445"), "1.2345");
        assert_eq!(coerce("-0.00005"), "-0.0001");
        assert_eq!(coerce("12"), "12.0000");
    }

    #[test]
    fn coerce_keeps_misfit_values_raw() {
        assert_eq!(
            ColumnType::Integer.coerce("abc"),
            Value::Raw("abc".to_string())
        );
        assert_eq!(
            ColumnType::Decimal.coerce("n/a"),
            Value::Raw("n/a".to_string())
        );
        assert_eq!(
            ColumnType::Integer.coerce("20 "),
            Value::Raw("20 ".to_string())
        );
        assert_eq!(
            ColumnType::Decimal.coerce(" 41.6"),
            Value::Raw(" 41.6".to_string())
        );
        assert_eq!(ColumnType::Integer.coerce("20"), Value::Integer(20));
        assert_eq!(ColumnType::Text.coerce("20"), Value::Text("20".to_string()));
    }

    #[test]
    fn empty_values_become_null() {
        assert_eq!(ColumnType::Integer.coerce(""), Value::Null);
        assert_eq!(ColumnType::Text.coerce(""), Value::Null);
    }

    #[test]
    fn declared_types_map_back_to_buckets() {
        for ty in [ColumnType::Integer, ColumnType::Decimal, ColumnType::Text] {
            assert_eq!(ColumnType::from_declared(&ty.sql_type()), ty);
        }
        assert_eq!(ColumnType::from_declared("varchar(20)"), ColumnType::Text);
    }

    #[test]
    fn inferred_schema_follows_record_order() {
        let record: Record = [
            ("entity_id", "340"),
            ("sku", "20"),
            ("price", "41.6000"),
            ("name", "X"),
        ]
        .into_iter()
        .collect();
        let schema = InferredSchema::from_record(&record);
        let names: Vec<_> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["entity_id", "sku", "price", "name"]);
        assert_eq!(schema.column("PRICE").unwrap().column_type, ColumnType::Decimal);
        assert_eq!(schema.column("name").unwrap().column_type, ColumnType::Text);
    }
}
