//! Shared SQL text assembly for the bulk insert and staged update paths.
//!
//! Identifiers passed in here come from caller configuration. Values are
//! always routed through the encoder.

use std::collections::HashSet;

use crate::database::dialect::SqlDialect;
use crate::database::encoder::encode_value;
use crate::database::error::ValidationError;
use crate::database::sql_value::{ColumnSpec, Row};

/// Checks the column list is non-empty, named and free of duplicates.
pub fn validate_columns(columns: &[ColumnSpec]) -> Result<(), ValidationError> {
    if columns.is_empty() {
        return Err(ValidationError::NoColumns);
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        if column.name.is_empty() {
            return Err(ValidationError::EmptyIdentifier(i));
        }
        if !seen.insert(column.name.to_ascii_lowercase()) {
            return Err(ValidationError::DuplicateColumn(column.name.clone()));
        }
    }

    Ok(())
}

/// Checks the batch is non-empty and every row matches the column count.
pub fn validate_batch(columns: &[ColumnSpec], batch: &[Row]) -> Result<(), ValidationError> {
    validate_columns(columns)?;

    if batch.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    for (row, fields) in batch.iter().enumerate() {
        if fields.len() != columns.len() {
            return Err(ValidationError::ArityMismatch {
                row,
                expected: columns.len(),
                found: fields.len(),
            });
        }
    }

    Ok(())
}

pub fn check_statement_length(sql: &str, limit: Option<usize>) -> Result<(), ValidationError> {
    match limit {
        Some(limit) if sql.len() > limit => {
            Err(ValidationError::StatementTooLong { length: sql.len(), limit })
        }
        _ => Ok(()),
    }
}

/// Builds `col1, col2, ...` in the given order.
pub fn build_column_list(dialect: SqlDialect, columns: &[ColumnSpec]) -> String {
    columns.iter().map(|col| dialect.quote_identifier(&col.name)).collect::<Vec<_>>().join(", ")
}

/// Builds `INSERT INTO table (col1, col2, ...)`.
pub fn build_insert_header(
    dialect: SqlDialect,
    table_name: &str,
    columns: &[ColumnSpec],
) -> String {
    format!(
        "INSERT INTO {} ({})",
        dialect.format_table_name(table_name),
        build_column_list(dialect, columns)
    )
}

/// Builds `VALUES (p1, p2), (p3, p4), ...` with parameters numbered row by row.
pub fn build_placeholder_rows(
    dialect: SqlDialect,
    row_count: usize,
    column_count: usize,
) -> String {
    let rows = (0..row_count)
        .map(|i| {
            let base = i * column_count + 1;
            let placeholders = (0..column_count)
                .map(|j| dialect.placeholder(base + j))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", placeholders)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("VALUES {}", rows)
}

/// Builds `SELECT lit1, lit2, ...` for one row.
pub fn build_select_row(dialect: SqlDialect, columns: &[ColumnSpec], row: &Row) -> String {
    let literals = columns
        .iter()
        .zip(row)
        .map(|(col, value)| dialect.typed_literal(col.kind, encode_value(value, col.kind)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("SELECT {}", literals)
}

/// Joins one `SELECT` per row with the union separator.
pub fn build_union_rows<'a, I>(
    dialect: SqlDialect,
    columns: &[ColumnSpec],
    rows: I,
    union_separator: &str,
) -> String
where
    I: IntoIterator<Item = &'a Row>,
{
    let separator = format!(" {} ", union_separator.trim());
    rows.into_iter()
        .map(|row| build_select_row(dialect, columns, row))
        .collect::<Vec<_>>()
        .join(&separator)
}

/// Builds the DDL for a staging table with one column per entry of `columns`.
pub fn build_create_staging_table(
    dialect: SqlDialect,
    staging_table: &str,
    columns: &[ColumnSpec],
) -> String {
    let definitions = columns
        .iter()
        .map(|col| {
            format!("{} {}", dialect.quote_identifier(&col.name), dialect.column_type(col.kind))
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{} {} ({})",
        dialect.create_temporary_table_keyword(),
        dialect.quote_identifier(staging_table),
        definitions
    )
}

pub fn build_drop_staging_table(dialect: SqlDialect, staging_table: &str) -> String {
    format!(
        "{} {}",
        dialect.drop_temporary_table_keyword(),
        dialect.quote_identifier(staging_table)
    )
}

/// Builds the set-based UPDATE joining `table_name` to the staging table on
/// `key`, assigning every changed column from the staging copy.
pub fn build_update_from_staging(
    dialect: SqlDialect,
    table_name: &str,
    staging_table: &str,
    key: &ColumnSpec,
    changed: &[ColumnSpec],
) -> String {
    let table = dialect.format_table_name(table_name);
    let staging = dialect.quote_identifier(staging_table);
    let key_col = dialect.quote_identifier(&key.name);
    let join_condition = format!("t.{} = s.{}", key_col, key_col);

    let assignments = |qualify_target: bool| {
        changed
            .iter()
            .map(|col| {
                let name = dialect.quote_identifier(&col.name);
                if qualify_target {
                    format!("t.{} = s.{}", name, name)
                } else {
                    format!("{} = s.{}", name, name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    match dialect {
        SqlDialect::SqlServer => format!(
            "UPDATE t SET {} FROM {} AS t INNER JOIN {} AS s ON {}",
            assignments(true),
            table,
            staging,
            join_condition
        ),
        SqlDialect::MySql => format!(
            "UPDATE {} AS t INNER JOIN {} AS s ON {} SET {}",
            table,
            staging,
            join_condition,
            assignments(true)
        ),
        SqlDialect::Postgres | SqlDialect::Sqlite => format!(
            "UPDATE {} AS t SET {} FROM {} AS s WHERE {}",
            table,
            assignments(false),
            staging,
            join_condition
        ),
    }
}
