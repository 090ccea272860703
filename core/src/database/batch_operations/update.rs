//! Set-based bulk UPDATE through a per-batch staging table.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::database::batch_operations::query_builder::{
    build_create_staging_table, build_drop_staging_table, build_insert_header, build_union_rows,
    build_update_from_staging, check_statement_length, validate_batch, validate_columns,
};
use crate::database::dialect::SqlDialect;
use crate::database::encoder::encode_value;
use crate::database::error::{BulkWriteError, ExecutionError, ValidationError};
use crate::database::sink::ExecutionSink;
use crate::database::sql_value::{ColumnSpec, Row, SqlValue};
use crate::helpers::generate_staging_token;

/// A session scoped temporary table holding one batch of key/value updates.
///
/// The table is dropped when the guard goes out of scope, whatever the exit
/// path. Use [`StagingArea::discard`] on the success path to observe a failed
/// drop; on failure paths the drop error is only logged so the original error
/// reaches the caller.
pub struct StagingArea<'s, S: ExecutionSink> {
    sink: &'s mut S,
    dialect: SqlDialect,
    name: String,
    discarded: bool,
}

impl<'s, S: ExecutionSink> StagingArea<'s, S> {
    pub fn create(
        sink: &'s mut S,
        dialect: SqlDialect,
        name: String,
        columns: &[ColumnSpec],
    ) -> Result<Self, ExecutionError> {
        let sql = build_create_staging_table(dialect, &name, columns);
        debug!("Creating staging table: {}", sql);

        sink.execute(&sql, &[]).map_err(|e| ExecutionError::new("create staging table", sql, e))?;

        Ok(StagingArea { sink, dialect, name, discarded: false })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn execute(&mut self, stage: &'static str, sql: &str) -> Result<u64, ExecutionError> {
        debug!("{} on {}: {}", stage, self.name, sql);
        self.sink.execute(sql, &[]).map_err(|e| ExecutionError::new(stage, sql, e))
    }

    /// Drops the table and reports whether that succeeded.
    pub fn discard(mut self) -> Result<(), ExecutionError> {
        self.drop_table()
    }

    fn drop_table(&mut self) -> Result<(), ExecutionError> {
        // one attempt only, a failed drop is not retried from Drop
        self.discarded = true;
        let sql = build_drop_staging_table(self.dialect, &self.name);
        debug!("Discarding staging table: {}", sql);
        self.sink
            .execute(&sql, &[])
            .map(|_| ())
            .map_err(|e| ExecutionError::new("discard staging table", sql, e))
    }
}

impl<S: ExecutionSink> Drop for StagingArea<'_, S> {
    fn drop(&mut self) {
        if self.discarded {
            return;
        }
        if let Err(e) = self.drop_table() {
            warn!("Could not discard staging table {}: {}", self.name, e);
        }
    }
}

/// Applies key/value updates to one table, one staging cycle per batch.
///
/// Each row passed to [`StagedBulkUpdater::apply`] is laid out as the key
/// followed by the changed columns, in order. Keys missing from the target
/// table are ignored, target rows missing from the batch are left untouched.
/// When a key repeats inside a batch the last occurrence wins.
#[derive(Debug, Clone)]
pub struct StagedBulkUpdater<'a> {
    dialect: SqlDialect,
    table_name: &'a str,
    columns: Vec<ColumnSpec>,
    union_separator: &'a str,
    max_statement_length: Option<usize>,
}

impl<'a> StagedBulkUpdater<'a> {
    pub fn new(
        dialect: SqlDialect,
        table_name: &'a str,
        key: &ColumnSpec,
        changed: &[ColumnSpec],
    ) -> Self {
        let mut columns = Vec::with_capacity(changed.len() + 1);
        columns.push(key.clone());
        columns.extend_from_slice(changed);

        StagedBulkUpdater {
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

    pub fn key(&self) -> &ColumnSpec {
        &self.columns[0]
    }

    pub fn changed(&self) -> &[ColumnSpec] {
        &self.columns[1..]
    }

    /// Key column followed by the changed columns.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_columns(&self.columns).map_err(|e| match e {
            ValidationError::DuplicateColumn(name)
                if name.eq_ignore_ascii_case(&self.key().name) =>
            {
                ValidationError::KeyColumnChanged(name)
            }
            e => e,
        })?;
        if self.changed().is_empty() {
            return Err(ValidationError::NoChangedColumns);
        }
        Ok(())
    }

    /// Keeps one row per key, holding the values of the key's last occurrence
    /// at the position of its first occurrence.
    fn last_write_wins<'r>(&self, batch: &'r [Row]) -> Vec<&'r Row> {
        let key_kind = self.key().kind;
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(batch.len());
        let mut deduplicated: Vec<&Row> = Vec::with_capacity(batch.len());

        for row in batch {
            let key = encode_value(row.first().unwrap_or(&SqlValue::Null), key_kind);
            match positions.get(&key) {
                Some(&position) => deduplicated[position] = row,
                None => {
                    positions.insert(key, deduplicated.len());
                    deduplicated.push(row);
                }
            }
        }

        deduplicated
    }

    /// Runs create, populate, apply and discard for one batch and returns the
    /// number of target rows the UPDATE touched.
    pub fn apply<S: ExecutionSink>(
        &self,
        sink: &mut S,
        batch: &[Row],
    ) -> Result<u64, BulkWriteError> {
        self.validate()?;
        validate_batch(&self.columns, batch)?;

        let rows = self.last_write_wins(batch);
        if rows.len() < batch.len() {
            debug!(
                "{} duplicate keys collapsed for {}, last occurrence kept",
                batch.len() - rows.len(),
                self.table_name
            );
        }

        let staging_name = self.dialect.temporary_table_name(&generate_staging_token());

        let populate_sql = format!(
            "{} {}",
            build_insert_header(self.dialect, &staging_name, &self.columns),
            build_union_rows(self.dialect, &self.columns, rows, self.union_separator)
        );
        check_statement_length(&populate_sql, self.max_statement_length)?;

        let apply_sql = build_update_from_staging(
            self.dialect,
            self.table_name,
            &staging_name,
            self.key(),
            self.changed(),
        );

        let mut staging = StagingArea::create(sink, self.dialect, staging_name, &self.columns)?;
        staging.execute("populate staging table", &populate_sql)?;
        let updated = staging.execute("apply staged update", &apply_sql)?;
        staging.discard()?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;
    use crate::database::sqlite::SqliteClient;

    #[derive(Debug)]
    struct InjectedFailure(String);

    impl fmt::Display for InjectedFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "injected failure on {}", self.0)
        }
    }

    impl std::error::Error for InjectedFailure {}

    /// Records statements and fails those starting with `fail_on`.
    #[derive(Default)]
    struct RecordingSink {
        statements: Vec<String>,
        fail_on: Vec<&'static str>,
    }

    impl ExecutionSink for RecordingSink {
        type Error = InjectedFailure;

        fn execute(&mut self, statement: &str, _params: &[SqlValue]) -> Result<u64, Self::Error> {
            self.statements.push(statement.to_string());
            if self.fail_on.iter().any(|prefix| statement.starts_with(prefix)) {
                return Err(InjectedFailure(statement.to_string()));
            }
            Ok(1)
        }

        fn begin(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn commit(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn setup_employees() -> SqliteClient {
        let client = SqliteClient::open_in_memory().unwrap();
        client
            .batch_execute(
                "CREATE TABLE employees (matricule TEXT PRIMARY KEY, name TEXT, salary NUMERIC);
                 INSERT INTO employees VALUES
                     ('001', 'Ada', 1000), ('002', 'Grace', 2000), ('003', 'Linus', 3000);",
            )
            .unwrap();
        client
    }

    fn staging_tables(client: &mut SqliteClient) -> i64 {
        client
            .query_scalar("SELECT COUNT(*) FROM sqlite_temp_master WHERE type = 'table'")
            .unwrap()
    }

    fn salary_of(client: &mut SqliteClient, matricule: &str) -> i64 {
        client
            .query_scalar(&format!(
                "SELECT CAST(salary AS INTEGER) FROM employees WHERE matricule = '{}'",
                matricule
            ))
            .unwrap()
    }

    fn salary_updater() -> StagedBulkUpdater<'static> {
        StagedBulkUpdater::new(
            SqlDialect::Sqlite,
            "employees",
            &ColumnSpec::text("matricule"),
            &[ColumnSpec::numeric("salary")],
        )
    }

    #[test]
    fn test_updates_matching_rows_only() {
        let mut client = setup_employees();
        let batch = vec![
            vec![SqlValue::text("001"), SqlValue::Integer(1100)],
            vec![SqlValue::text("003"), SqlValue::text("3300.00")],
            vec![SqlValue::text("999"), SqlValue::Integer(9)],
        ];

        let updated = salary_updater().apply(&mut client, &batch).unwrap();

        assert_eq!(updated, 2);
        assert_eq!(salary_of(&mut client, "001"), 1100);
        assert_eq!(salary_of(&mut client, "002"), 2000);
        assert_eq!(salary_of(&mut client, "003"), 3300);
        assert_eq!(staging_tables(&mut client), 0);
    }

    #[test]
    fn test_last_write_wins_tolerates_rows_without_key() {
        let updater = salary_updater();
        let batch = vec![
            vec![],
            vec![SqlValue::Null, SqlValue::Integer(1)],
            vec![SqlValue::text("001"), SqlValue::Integer(1500)],
        ];

        let kept = updater.last_write_wins(&batch);

        // a missing key dedupes like a NULL key
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], &batch[1]);
        assert_eq!(kept[1], &batch[2]);
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let mut client = setup_employees();
        let batch = vec![
            vec![SqlValue::text("001"), SqlValue::Integer(1500)],
            vec![SqlValue::text("002"), SqlValue::Integer(2100)],
            vec![SqlValue::text("001"), SqlValue::Integer(1750)],
        ];

        let updater = salary_updater();
        let kept = updater.last_write_wins(&batch);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0][1], SqlValue::Integer(1750));

        updater.apply(&mut client, &batch).unwrap();

        assert_eq!(salary_of(&mut client, "001"), 1750);
        assert_eq!(salary_of(&mut client, "002"), 2100);
    }

    #[test]
    fn test_apply_failure_discards_staging_and_surfaces_original_error() {
        let mut client = setup_employees();
        let updater = StagedBulkUpdater::new(
            SqlDialect::Sqlite,
            "missing_table",
            &ColumnSpec::text("matricule"),
            &[ColumnSpec::numeric("salary")],
        );
        let batch = vec![vec![SqlValue::text("001"), SqlValue::Integer(1)]];

        let error = updater.apply(&mut client, &batch).unwrap_err();

        match error {
            BulkWriteError::Execution(e) => {
                assert_eq!(e.stage, "apply staged update");
                assert!(e.statement.starts_with("UPDATE missing_table"));
                assert!(e.source.to_string().contains("missing_table"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(staging_tables(&mut client), 0);
    }

    #[test]
    fn test_failure_sequence_still_discards() {
        let mut sink = RecordingSink { fail_on: vec!["UPDATE"], ..Default::default() };
        let batch = vec![vec![SqlValue::text("001"), SqlValue::Integer(1)]];

        let error = salary_updater().apply(&mut sink, &batch).unwrap_err();

        assert!(error.to_string().starts_with("apply staged update failed"));
        assert_eq!(sink.statements.len(), 4);
        assert!(sink.statements[0].starts_with("CREATE TEMP TABLE rbulk_stage_"));
        assert!(sink.statements[1].starts_with("INSERT INTO rbulk_stage_"));
        assert!(sink.statements[2].starts_with("UPDATE employees AS t"));
        assert!(sink.statements[3].starts_with("DROP TABLE IF EXISTS rbulk_stage_"));
    }

    #[test]
    fn test_cleanup_failure_does_not_mask_original_error() {
        let mut sink =
            RecordingSink { fail_on: vec!["INSERT", "DROP"], ..Default::default() };
        let batch = vec![vec![SqlValue::text("001"), SqlValue::Integer(1)]];

        let error = salary_updater().apply(&mut sink, &batch).unwrap_err();

        assert!(error.to_string().starts_with("populate staging table failed"));
        assert!(sink.statements.last().unwrap().starts_with("DROP TABLE IF EXISTS"));
    }

    #[test]
    fn test_cleanup_failure_on_success_path_is_reported() {
        let mut sink = RecordingSink { fail_on: vec!["DROP"], ..Default::default() };
        let batch = vec![vec![SqlValue::text("001"), SqlValue::Integer(1)]];

        let error = salary_updater().apply(&mut sink, &batch).unwrap_err();

        assert!(error.to_string().starts_with("discard staging table failed"));
        // the guard does not retry the drop
        assert_eq!(sink.statements.iter().filter(|s| s.starts_with("DROP")).count(), 1);
    }

    #[test]
    fn test_staging_names_are_unique() {
        let mut sink = RecordingSink::default();
        let batch = vec![vec![SqlValue::text("001"), SqlValue::Integer(1)]];
        let updater = salary_updater();

        updater.apply(&mut sink, &batch).unwrap();
        updater.apply(&mut sink, &batch).unwrap();

        assert_ne!(sink.statements[0], sink.statements[4]);
    }

    #[test]
    fn test_validation_happens_before_any_statement() {
        let mut sink = RecordingSink::default();

        let no_changes =
            StagedBulkUpdater::new(SqlDialect::Sqlite, "employees", &ColumnSpec::text("id"), &[]);
        assert!(matches!(
            no_changes.apply(&mut sink, &[vec![SqlValue::text("1")]]),
            Err(BulkWriteError::Validation(ValidationError::NoChangedColumns))
        ));

        let key_changed = StagedBulkUpdater::new(
            SqlDialect::Sqlite,
            "employees",
            &ColumnSpec::text("id"),
            &[ColumnSpec::text("id")],
        );
        assert!(matches!(
            key_changed.apply(&mut sink, &[vec![SqlValue::text("1"), SqlValue::text("1")]]),
            Err(BulkWriteError::Validation(ValidationError::KeyColumnChanged(_)))
        ));

        assert!(matches!(
            salary_updater().apply(&mut sink, &[]),
            Err(BulkWriteError::Validation(ValidationError::EmptyBatch))
        ));

        assert!(sink.statements.is_empty());
    }
}
