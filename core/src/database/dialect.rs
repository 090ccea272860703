//! Per-vendor SQL primitives: identifier quoting, placeholders, temporary
//! tables, column types and limits.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::database::encoder::NULL_LITERAL;
use crate::database::error::ConfigurationError;
use crate::database::sql_value::ColumnKind;

/// Reserved SQL keywords that need quoting when used as identifiers.
pub const RESERVED_KEYWORDS: &[&str] = &[
    "group", "user", "order", "table", "index", "primary", "key", "select", "from", "where",
    "union", "all", "insert", "update", "delete", "values", "into", "set", "join", "on", "as",
    "default", "check", "column", "references", "limit", "offset",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SqlDialect {
    #[default]
    #[serde(rename = "sqlserver", alias = "mssql")]
    SqlServer,
    #[serde(rename = "postgres", alias = "postgresql")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "sqlite")]
    Sqlite,
}

/// Data store ceilings that govern batch sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectLimits {
    pub max_bound_parameters: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_statement_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_compound_select: Option<usize>,
}

impl Default for DialectLimits {
    fn default() -> Self {
        SqlDialect::default().default_limits()
    }
}

impl DialectLimits {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_bound_parameters == 0 {
            return Err(ConfigurationError::NoBoundParameters);
        }
        if self.max_statement_length == Some(0) {
            return Err(ConfigurationError::ZeroStatementLength);
        }
        Ok(())
    }
}

impl SqlDialect {
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::SqlServer => "SQL Server",
            SqlDialect::Postgres => "PostgreSQL",
            SqlDialect::MySql => "MySQL",
            SqlDialect::Sqlite => "SQLite",
        }
    }

    pub fn default_limits(&self) -> DialectLimits {
        match self {
            SqlDialect::SqlServer => DialectLimits {
                max_bound_parameters: 2100,
                max_statement_length: None,
                max_compound_select: None,
            },
            SqlDialect::Postgres | SqlDialect::MySql => DialectLimits {
                max_bound_parameters: 65535,
                max_statement_length: None,
                max_compound_select: None,
            },
            // SQLITE_MAX_VARIABLE_NUMBER and SQLITE_MAX_COMPOUND_SELECT defaults
            SqlDialect::Sqlite => DialectLimits {
                max_bound_parameters: 32766,
                max_statement_length: Some(1_000_000_000),
                max_compound_select: Some(500),
            },
        }
    }

    fn quote_chars(&self) -> (char, char) {
        match self {
            SqlDialect::SqlServer => ('[', ']'),
            SqlDialect::MySql => ('`', '`'),
            SqlDialect::Postgres | SqlDialect::Sqlite => ('"', '"'),
        }
    }

    /// Quotes an identifier if it's a reserved keyword or not a plain word.
    pub fn quote_identifier(&self, name: &str) -> String {
        if !needs_quoting(name) {
            return name.to_string();
        }

        let (open, close) = self.quote_chars();
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(open);
        for c in name.chars() {
            if c == close {
                quoted.push(close);
            }
            quoted.push(c);
        }
        quoted.push(close);
        quoted
    }

    /// Formats a table name, handling schema.table format.
    pub fn format_table_name(&self, table_name: &str) -> String {
        match table_name.split_once('.') {
            Some((schema, table)) if !table.contains('.') => {
                format!("{}.{}", self.quote_identifier(schema), self.quote_identifier(table))
            }
            _ => self.quote_identifier(table_name),
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::SqlServer => format!("@p{}", index),
            SqlDialect::Postgres => format!("${}", index),
            SqlDialect::MySql => "?".to_string(),
            SqlDialect::Sqlite => format!("?{}", index),
        }
    }

    pub fn column_type(&self, kind: ColumnKind) -> &'static str {
        match (self, kind) {
            (SqlDialect::SqlServer, ColumnKind::Text) => "NVARCHAR(4000)",
            (SqlDialect::SqlServer, ColumnKind::Numeric) => "DECIMAL(38, 10)",
            (SqlDialect::Postgres, ColumnKind::Text) => "TEXT",
            (SqlDialect::Postgres, ColumnKind::Numeric) => "NUMERIC",
            (SqlDialect::MySql, ColumnKind::Text) => "TEXT",
            (SqlDialect::MySql, ColumnKind::Numeric) => "DECIMAL(65, 10)",
            (SqlDialect::Sqlite, ColumnKind::Text) => "TEXT",
            (SqlDialect::Sqlite, ColumnKind::Numeric) => "NUMERIC",
            (SqlDialect::Sqlite, ColumnKind::Date) => "TEXT",
            (_, ColumnKind::Date) => "DATE",
        }
    }

    /// Wraps an encoded literal so a `SELECT ... UNION ALL SELECT ...` row list
    /// resolves to the column's type.
    ///
    /// PostgreSQL resolves untyped literals in a union to `text`, which it
    /// will not assign to `date` or `numeric` columns.
    pub fn typed_literal(&self, kind: ColumnKind, literal: String) -> String {
        match (self, kind) {
            (SqlDialect::Postgres, ColumnKind::Date) => {
                format!("CAST({} AS {})", literal, self.column_type(kind))
            }
            (SqlDialect::Postgres, ColumnKind::Numeric) if literal == NULL_LITERAL => {
                format!("CAST({} AS {})", literal, self.column_type(kind))
            }
            _ => literal,
        }
    }

    /// Session scoped temporary table name for `token`.
    pub fn temporary_table_name(&self, token: &str) -> String {
        match self {
            SqlDialect::SqlServer => format!("#rbulk_stage_{}", token),
            _ => format!("rbulk_stage_{}", token),
        }
    }

    pub fn create_temporary_table_keyword(&self) -> &'static str {
        match self {
            SqlDialect::SqlServer => "CREATE TABLE",
            SqlDialect::Postgres | SqlDialect::MySql => "CREATE TEMPORARY TABLE",
            SqlDialect::Sqlite => "CREATE TEMP TABLE",
        }
    }

    pub fn drop_temporary_table_keyword(&self) -> &'static str {
        match self {
            SqlDialect::MySql => "DROP TEMPORARY TABLE IF EXISTS",
            _ => "DROP TABLE IF EXISTS",
        }
    }
}

impl FromStr for SqlDialect {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(SqlDialect::SqlServer),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "mysql" => Ok(SqlDialect::MySql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            other => Err(ConfigurationError::UnknownDialect(other.to_string())),
        }
    }
}

fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !starts_well || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return true;
    }
    RESERVED_KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(name))
}
