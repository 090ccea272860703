use std::fmt;

use chrono::NaiveDate;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single typed field of a row handed to the batch core.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Date(NaiveDate),
}

/// A row is an ordered sequence of fields matching the column list of the
/// operation it is passed to.
pub type Row = Vec<SqlValue>;

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }

    /// `None` maps to `Null`, which mirrors how optional source fields arrive.
    pub fn optional_text(value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => SqlValue::Text(value.into()),
            None => SqlValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Raw textual form used by the encoder, `None` for SQL NULL.
    pub fn as_raw_string(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Text(value) => Some(value.clone()),
            SqlValue::Integer(value) => Some(value.to_string()),
            SqlValue::Float(value) => Some(value.to_string()),
            SqlValue::Decimal(value) => Some(value.to_string()),
            SqlValue::Date(value) => Some(value.format("%Y-%m-%d").to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_raw_string() {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "NULL"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            SqlValue::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            SqlValue::Float(value) => ToSqlOutput::Owned(Value::Real(*value)),
            // SQLite has no exact decimal storage, NUMERIC affinity converts the text form
            SqlValue::Decimal(value) => ToSqlOutput::Owned(Value::Text(value.to_string())),
            SqlValue::Date(value) => {
                ToSqlOutput::Owned(Value::Text(value.format("%Y-%m-%d").to_string()))
            }
        })
    }
}

/// Semantic type of a column, selects the encoding rule for its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Numeric,
    Date,
}

/// Definition of a target column. Names come from caller configuration only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnSpec { name: name.into(), kind }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Numeric)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Date)
    }
}
