//! Runs a full batch sequence inside one transaction.

use tracing::{debug, error, info};

use crate::database::batch_operations::insert::BulkInsertBuilder;
use crate::database::batch_operations::query_builder::{validate_batch, validate_columns};
use crate::database::batch_operations::update::StagedBulkUpdater;
use crate::database::error::{BulkWriteError, ConfigurationError, ExecutionError};
use crate::database::planner::{plan, BatchPlan, EncodingMode};
use crate::database::sink::ExecutionSink;
use crate::database::sql_value::{ColumnSpec, Row};
use crate::manifest::config::BulkConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteSummary {
    pub batches: usize,
    pub rows: usize,
    pub rows_affected: u64,
}

/// Plans, builds and executes bulk writes with one configuration.
#[derive(Debug, Clone)]
pub struct BulkWriter {
    config: BulkConfig,
}

impl BulkWriter {
    pub fn new(config: BulkConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(BulkWriter { config })
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Plans `total_rows` rows of `column_count` columns in `mode`.
    pub fn plan(
        &self,
        total_rows: usize,
        column_count: usize,
        mode: EncodingMode,
    ) -> Result<BatchPlan, ConfigurationError> {
        plan(
            self.config.dialect,
            total_rows,
            column_count,
            &self.config.limits(),
            mode,
            self.config.batch_size,
        )
    }

    /// Inserts every row, one statement per planned batch.
    pub fn insert<S: ExecutionSink>(
        &self,
        sink: &mut S,
        table_name: &str,
        columns: &[ColumnSpec],
        rows: &[Row],
    ) -> Result<BulkWriteSummary, BulkWriteError> {
        let mode = self.config.encoding;
        let plan = self.plan(rows.len(), columns.len(), mode)?;
        validate_columns(columns)?;
        if rows.is_empty() {
            return Ok(BulkWriteSummary::default());
        }
        validate_batch(columns, rows)?;

        let limits = self.config.limits();
        let builder = BulkInsertBuilder::new(self.config.dialect, table_name, columns)
            .union_separator(&self.config.union_separator)
            .max_statement_length(limits.max_statement_length);

        debug!(
            "Inserting {} rows into {} in {} batches of up to {} ({:?})",
            rows.len(),
            table_name,
            plan.batch_count(),
            plan.batch_size(),
            mode
        );

        let summary = in_transaction(sink, |sink| {
            let mut summary = BulkWriteSummary { rows: rows.len(), ..Default::default() };
            for range in &plan {
                let statement = builder.build(&rows[range], mode)?;
                summary.rows_affected += sink
                    .execute(&statement.sql, &statement.params)
                    .map_err(|e| ExecutionError::new("insert batch", statement.sql, e))?;
                summary.batches += 1;
            }
            Ok(summary)
        })?;

        info!(
            "Inserted {} rows into {} with {} statements",
            summary.rows_affected, table_name, summary.batches
        );

        Ok(summary)
    }

    /// Updates existing rows through one staging cycle per planned batch.
    ///
    /// Each row is the key value followed by one value per `changed` column.
    pub fn update<S: ExecutionSink>(
        &self,
        sink: &mut S,
        table_name: &str,
        key: &ColumnSpec,
        changed: &[ColumnSpec],
        rows: &[Row],
    ) -> Result<BulkWriteSummary, BulkWriteError> {
        let limits = self.config.limits();
        let updater = StagedBulkUpdater::new(self.config.dialect, table_name, key, changed)
            .union_separator(&self.config.union_separator)
            .max_statement_length(limits.max_statement_length);

        // staging tables are always populated with literal row lists
        let plan = self.plan(rows.len(), updater.columns().len(), EncodingMode::LiteralValues)?;
        updater.validate()?;
        if rows.is_empty() {
            return Ok(BulkWriteSummary::default());
        }
        validate_batch(updater.columns(), rows)?;

        debug!(
            "Updating {} from {} rows in {} staged batches of up to {}",
            table_name,
            rows.len(),
            plan.batch_count(),
            plan.batch_size()
        );

        let summary = in_transaction(sink, |sink| {
            let mut summary = BulkWriteSummary { rows: rows.len(), ..Default::default() };
            for range in &plan {
                summary.rows_affected += updater.apply(sink, &rows[range])?;
                summary.batches += 1;
            }
            Ok(summary)
        })?;

        info!(
            "Updated {} rows of {} with {} staged batches",
            summary.rows_affected, table_name, summary.batches
        );

        Ok(summary)
    }
}

/// Begins a transaction, runs `f`, commits on success and rolls back on any
/// failure. The original failure is returned; a failed rollback is logged.
fn in_transaction<S, T, F>(sink: &mut S, f: F) -> Result<T, BulkWriteError>
where
    S: ExecutionSink,
    F: FnOnce(&mut S) -> Result<T, BulkWriteError>,
{
    sink.begin().map_err(|e| ExecutionError::new("begin transaction", "BEGIN", e))?;

    match f(sink) {
        Ok(result) => {
            if let Err(e) = sink.commit() {
                let error = ExecutionError::new("commit transaction", "COMMIT", e);
                rollback(sink);
                return Err(error.into());
            }
            Ok(result)
        }
        Err(e) => {
            error!("Bulk write failed, rolling back: {}", e);
            rollback(sink);
            Err(e)
        }
    }
}

fn rollback<S: ExecutionSink>(sink: &mut S) {
    if let Err(e) = sink.rollback() {
        error!("Rollback failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::dialect::{DialectLimits, SqlDialect};
    use crate::database::error::ValidationError;
    use crate::database::sql_value::SqlValue;
    use crate::database::sqlite::SqliteClient;

    fn employee_columns() -> Vec<ColumnSpec> {
        vec![ColumnSpec::text("matricule"), ColumnSpec::text("name"), ColumnSpec::numeric("salary")]
    }

    fn employees(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| {
                vec![
                    SqlValue::text(format!("{:05}", i)),
                    SqlValue::text(format!("Employee {}'s", i)),
                    SqlValue::Integer(1000 + i as i64),
                ]
            })
            .collect()
    }

    fn setup() -> SqliteClient {
        let client = SqliteClient::open_in_memory().unwrap();
        client
            .batch_execute(
                "CREATE TABLE employees (matricule TEXT PRIMARY KEY, name TEXT, salary NUMERIC)",
            )
            .unwrap();
        client
    }

    fn count(client: &mut SqliteClient) -> i64 {
        client.query_scalar("SELECT COUNT(*) FROM employees").unwrap()
    }

    #[test]
    fn test_literal_insert_in_batches() {
        let mut client = setup();
        let writer =
            BulkWriter::new(BulkConfig::new(SqlDialect::Sqlite).with_batch_size(300)).unwrap();

        let summary =
            writer.insert(&mut client, "employees", &employee_columns(), &employees(1000)).unwrap();

        assert_eq!(summary, BulkWriteSummary { batches: 4, rows: 1000, rows_affected: 1000 });
        assert_eq!(count(&mut client), 1000);
        let name: String = client
            .query_scalar("SELECT name FROM employees WHERE matricule = '00042'")
            .unwrap();
        assert_eq!(name, "Employee 42's");
    }

    #[test]
    fn test_bound_insert_respects_parameter_ceiling() {
        let mut client = setup();
        let config = BulkConfig::new(SqlDialect::Sqlite)
            .with_encoding(EncodingMode::BoundParameters)
            .with_limits(DialectLimits {
                max_bound_parameters: 2100,
                ..SqlDialect::Sqlite.default_limits()
            });
        let writer = BulkWriter::new(config).unwrap();

        let summary =
            writer.insert(&mut client, "employees", &employee_columns(), &employees(1000)).unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(count(&mut client), 1000);
    }

    #[test]
    fn test_failed_batch_rolls_back_everything() {
        let mut client = setup();
        let writer =
            BulkWriter::new(BulkConfig::new(SqlDialect::Sqlite).with_batch_size(100)).unwrap();
        let mut rows = employees(250);
        // primary key collision in the third batch
        rows[220][0] = SqlValue::text("00001");

        let error =
            writer.insert(&mut client, "employees", &employee_columns(), &rows).unwrap_err();

        assert!(matches!(error, BulkWriteError::Execution(_)));
        assert_eq!(count(&mut client), 0);
    }

    #[test]
    fn test_shape_errors_issue_no_statements() {
        let mut client = setup();
        let writer = BulkWriter::new(BulkConfig::new(SqlDialect::Sqlite)).unwrap();
        let mut rows = employees(10);
        rows[7].pop();

        let error =
            writer.insert(&mut client, "employees", &employee_columns(), &rows).unwrap_err();

        assert!(matches!(
            error,
            BulkWriteError::Validation(ValidationError::ArityMismatch { row: 7, .. })
        ));
        assert!(matches!(
            writer.insert(&mut client, "employees", &[], &rows),
            Err(BulkWriteError::Configuration(ConfigurationError::NoColumns))
        ));
    }

    #[test]
    fn test_empty_input_is_a_no_op() {
        let mut client = setup();
        let writer = BulkWriter::new(BulkConfig::new(SqlDialect::Sqlite)).unwrap();

        let summary = writer.insert(&mut client, "employees", &employee_columns(), &[]).unwrap();

        assert_eq!(summary, BulkWriteSummary::default());
    }

    #[test]
    fn test_staged_update_across_batches() {
        let mut client = setup();
        let writer =
            BulkWriter::new(BulkConfig::new(SqlDialect::Sqlite).with_batch_size(200)).unwrap();
        writer.insert(&mut client, "employees", &employee_columns(), &employees(500)).unwrap();

        let updates: Vec<Row> = (0..500)
            .map(|i| vec![SqlValue::text(format!("{:05}", i)), SqlValue::Integer(5000 + i)])
            .collect();

        let summary = writer
            .update(
                &mut client,
                "employees",
                &ColumnSpec::text("matricule"),
                &[ColumnSpec::numeric("salary")],
                &updates,
            )
            .unwrap();

        assert_eq!(summary, BulkWriteSummary { batches: 3, rows: 500, rows_affected: 500 });
        let total: i64 = client
            .query_scalar("SELECT CAST(SUM(salary) AS INTEGER) FROM employees")
            .unwrap();
        assert_eq!(total, (5000..5500).sum::<i64>());
        let staging: i64 = client
            .query_scalar("SELECT COUNT(*) FROM sqlite_temp_master WHERE type = 'table'")
            .unwrap();
        assert_eq!(staging, 0);
    }

    #[test]
    fn test_failed_update_rolls_back_earlier_batches() {
        let mut client = SqliteClient::open_in_memory().unwrap();
        client
            .batch_execute(
                "CREATE TABLE accounts (id TEXT PRIMARY KEY, balance NUMERIC CHECK (balance >= 0));
                 INSERT INTO accounts VALUES ('a', 10), ('b', 20), ('c', 30), ('d', 40);",
            )
            .unwrap();
        let writer =
            BulkWriter::new(BulkConfig::new(SqlDialect::Sqlite).with_batch_size(2)).unwrap();

        let updates: Vec<Row> = vec![
            vec![SqlValue::text("a"), SqlValue::Integer(11)],
            vec![SqlValue::text("b"), SqlValue::Integer(21)],
            vec![SqlValue::text("c"), SqlValue::Integer(31)],
            vec![SqlValue::text("d"), SqlValue::Integer(-1)],
        ];

        // the second batch violates the CHECK constraint
        let error = writer
            .update(
                &mut client,
                "accounts",
                &ColumnSpec::text("id"),
                &[ColumnSpec::numeric("balance")],
                &updates,
            )
            .unwrap_err();

        assert!(
            matches!(error, BulkWriteError::Execution(ref e) if e.stage == "apply staged update")
        );
        let total: i64 = client
            .query_scalar("SELECT CAST(SUM(balance) AS INTEGER) FROM accounts")
            .unwrap();
        assert_eq!(total, 100);
        let staging: i64 = client
            .query_scalar("SELECT COUNT(*) FROM sqlite_temp_master WHERE type = 'table'")
            .unwrap();
        assert_eq!(staging, 0);
    }
}
