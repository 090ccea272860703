//! Multi-row INSERT statement synthesis.

use crate::database::batch_operations::query_builder::{
    build_insert_header, build_placeholder_rows, build_union_rows, check_statement_length,
    validate_batch,
};
use crate::database::batch_operations::Statement;
use crate::database::dialect::SqlDialect;
use crate::database::encoder::coerce_value;
use crate::database::error::ValidationError;
use crate::database::planner::EncodingMode;
use crate::database::sql_value::{ColumnSpec, Row};

/// Builds INSERT statements for one target table.
#[derive(Debug, Clone)]
pub struct BulkInsertBuilder<'a> {
    dialect: SqlDialect,
    table_name: &'a str,
    columns: &'a [ColumnSpec],
    union_separator: &'a str,
    max_statement_length: Option<usize>,
}

impl<'a> BulkInsertBuilder<'a> {
    pub fn new(dialect: SqlDialect, table_name: &'a str, columns: &'a [ColumnSpec]) -> Self {
        BulkInsertBuilder {
            dialect,
            table_name,
            columns,
            union_separator: "UNION ALL",
            max_statement_length: dialect.default_limits().max_statement_length,
        }
    }

    pub fn union_separator(mut self, union_separator: &'a str) -> Self {
        self.union_separator = union_separator;
        self
    }

    pub fn max_statement_length(mut self, max_statement_length: Option<usize>) -> Self {
        self.max_statement_length = max_statement_length;
        self
    }

    /// Assembles one statement covering every row of `batch`, in input order.
    pub fn build(&self, batch: &[Row], mode: EncodingMode) -> Result<Statement, ValidationError> {
        validate_batch(self.columns, batch)?;

        let header = build_insert_header(self.dialect, self.table_name, self.columns);

        let statement = match mode {
            EncodingMode::BoundParameters => {
                let values = build_placeholder_rows(self.dialect, batch.len(), self.columns.len());
                let params = batch
                    .iter()
                    .flat_map(|row| {
                        self.columns
                            .iter()
                            .zip(row)
                            .map(|(col, value)| coerce_value(value, col.kind))
                    })
                    .collect();

                Statement { sql: format!("{} {}", header, values), params }
            }
            EncodingMode::LiteralValues => {
                let rows =
                    build_union_rows(self.dialect, self.columns, batch, self.union_separator);
                Statement::without_params(format!("{} {}", header, rows))
            }
        };

        check_statement_length(&statement.sql, self.max_statement_length)?;

        Ok(statement)
    }
}

/// Convenience wrapper over [`BulkInsertBuilder`] with default settings.
pub fn build_insert(
    dialect: SqlDialect,
    table_name: &str,
    columns: &[ColumnSpec],
    batch: &[Row],
    mode: EncodingMode,
) -> Result<Statement, ValidationError> {
    BulkInsertBuilder::new(dialect, table_name, columns).build(batch, mode)
}
