//! Batch INSERT and staged bulk UPDATE operations.
//!
//! Rows are partitioned by the planner, each batch becomes one statement (or
//! one staging cycle for updates), and the writer runs the batches in order
//! inside a single transaction.

mod insert;
mod query_builder;
mod update;
mod writer;

use crate::database::sql_value::SqlValue;

pub use insert::{build_insert, BulkInsertBuilder};
pub use query_builder::{
    build_column_list, build_create_staging_table, build_drop_staging_table, build_insert_header,
    build_placeholder_rows, build_select_row, build_union_rows, build_update_from_staging,
    validate_batch, validate_columns,
};
pub use update::{StagedBulkUpdater, StagingArea};
pub use writer::{BulkWriteSummary, BulkWriter};

/// SQL text plus the positional parameters it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn without_params(sql: String) -> Self {
        Statement { sql, params: Vec::new() }
    }
}
