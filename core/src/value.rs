//! Cell values, declared column types and the display codec
//!
//! Every value renders to exactly one canonical string through [`Display`].
//! Key encoding and the merge comparison both go through that rendering, so
//! two values are "the same" for reconciliation purposes iff they render the
//! same text.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TablesyncError};

/// Canonical text format for dates
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Integer,
    Number,
    Decimal,
    Boolean,
    Date,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Number => "number",
            DataType::Decimal => "decimal",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TablesyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "string" | "text" | "varchar" => Ok(DataType::String),
            "integer" | "int" | "bigint" => Ok(DataType::Integer),
            "number" | "float" | "double" => Ok(DataType::Number),
            "decimal" | "numeric" => Ok(DataType::Decimal),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "date" | "datetime" | "timestamp" => Ok(DataType::Date),
            other => Err(TablesyncError::invalid_input(format!(
                "Unknown column type: {other}"
            ))),
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Integer(i64),
    Number(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The declared type this value naturally belongs to, `None` for Null
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(DataType::String),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Number(_) => Some(DataType::Number),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Date(_) => Some(DataType::Date),
        }
    }

    /// Parse canonical text into a value of the given type. Empty text is Null
    /// for every type except String.
    pub fn parse(text: &str, data_type: DataType) -> Result<Value> {
        if text.is_empty() && data_type != DataType::String {
            return Ok(Value::Null);
        }
        let bad = |reason: String| {
            TablesyncError::data_processing(format!(
                "Cannot parse '{text}' as {data_type}: {reason}"
            ))
        };
        match data_type {
            DataType::String => Ok(Value::String(text.to_string())),
            DataType::Integer => text
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| bad(e.to_string())),
            DataType::Number => text
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|e| bad(e.to_string())),
            DataType::Decimal => Decimal::from_str(text)
                .map(Value::Decimal)
                .map_err(|e| bad(e.to_string())),
            DataType::Boolean => match text.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Boolean(true)),
                "false" | "0" | "no" => Ok(Value::Boolean(false)),
                _ => Err(bad("expected true or false".to_string())),
            },
            DataType::Date => parse_date(text)
                .map(Value::Date)
                .ok_or_else(|| bad(format!("expected '{DATE_FORMAT}' or '%Y-%m-%d'"))),
        }
    }

    /// Convert a JSON value into a value of the declared type
    pub fn from_json(json: &serde_json::Value, data_type: DataType) -> Result<Value> {
        use serde_json::Value as Json;

        match (json, data_type) {
            (Json::Null, _) => Ok(Value::Null),
            (Json::String(s), DataType::String) => Ok(Value::String(s.clone())),
            (Json::String(s), other) => Value::parse(s, other),
            (Json::Bool(b), DataType::Boolean) => Ok(Value::Boolean(*b)),
            (Json::Number(n), DataType::Integer) => n.as_i64().map(Value::Integer).ok_or_else(|| {
                TablesyncError::data_processing(format!("{n} is not a 64-bit integer"))
            }),
            (Json::Number(n), DataType::Number) => n.as_f64().map(Value::Number).ok_or_else(|| {
                TablesyncError::data_processing(format!("{n} is not representable as f64"))
            }),
            (Json::Number(n), DataType::Decimal) => Value::parse(&n.to_string(), DataType::Decimal),
            (Json::Number(n), DataType::String) => Ok(Value::String(n.to_string())),
            (Json::Bool(b), DataType::String) => Ok(Value::String(b.to_string())),
            (other, data_type) => Err(TablesyncError::data_processing(format!(
                "JSON value {other} does not fit column type {data_type}"
            ))),
        }
    }

    /// Convert to a JSON value; decimals and dates travel as canonical strings
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::String(s) => Json::String(s.clone()),
            Value::Integer(i) => Json::from(*i),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(n.to_string())),
            Value::Decimal(_) | Value::Date(_) => Json::String(self.to_string()),
            Value::Boolean(b) => Json::Bool(*b),
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
