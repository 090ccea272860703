use std::{env, path::Path};

use dotenv::dotenv;
use rusqlite::{params_from_iter, types::FromSql, Connection};
use tracing::{debug, error, info};

use crate::database::sink::ExecutionSink;
use crate::database::sql_value::SqlValue;

pub fn connection_string() -> String {
    dotenv().ok();
    // Default to ./rbulk.db if DATABASE_URL is not set
    env::var("DATABASE_URL").unwrap_or_else(|_| "./rbulk.db".to_string())
}

#[derive(thiserror::Error, Debug)]
pub enum SqliteConnectionError {
    #[error("Can not open the SQLite database at {path}: {source}")]
    CanNotConnectToDatabase {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Could not create the parent directory for {path}: {source}")]
    CouldNotCreateParentDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not apply SQLite pragmas: {0}")]
    CouldNotApplyPragmas(#[source] rusqlite::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
}

/// A single SQLite connection used as an [`ExecutionSink`].
///
/// The connection is held for the client's lifetime so temporary tables and
/// explicit transactions stay on one session.
pub struct SqliteClient {
    conn: Connection,
}

impl SqliteClient {
    /// Opens the database named by `DATABASE_URL`.
    pub fn new() -> Result<Self, SqliteConnectionError> {
        Self::open(connection_string())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteConnectionError> {
        let path = path.as_ref();
        let display_path = path.display().to_string();

        info!("Connecting to SQLite database at: {}", display_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    error!("Failed to create parent directories for SQLite database: {}", source);
                    SqliteConnectionError::CouldNotCreateParentDirectory {
                        path: display_path.clone(),
                        source,
                    }
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|source| {
            error!("Error connecting to SQLite database: {}", source);
            SqliteConnectionError::CanNotConnectToDatabase { path: display_path.clone(), source }
        })?;

        // Enable WAL mode for better write throughput
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(SqliteConnectionError::CouldNotApplyPragmas)?;

        info!("Successfully connected to SQLite database");
        Ok(SqliteClient { conn })
    }

    pub fn open_in_memory() -> Result<Self, SqliteConnectionError> {
        let conn = Connection::open_in_memory().map_err(|source| {
            SqliteConnectionError::CanNotConnectToDatabase { path: ":memory:".to_string(), source }
        })?;
        Ok(SqliteClient { conn })
    }

    pub fn batch_execute(&self, sql: &str) -> Result<(), SqliteError> {
        self.conn.execute_batch(sql).map_err(SqliteError::SqliteError)
    }

    /// Runs a query returning a single value in its first column.
    pub fn query_scalar<T: FromSql>(&self, sql: &str) -> Result<T, SqliteError> {
        self.conn.query_row(sql, [], |row| row.get(0)).map_err(SqliteError::SqliteError)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ExecutionSink for SqliteClient {
    type Error = SqliteError;

    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<u64, Self::Error> {
        let affected = if params.is_empty() {
            self.conn.execute(statement, [])?
        } else {
            let mut prepared = self.conn.prepare_cached(statement)?;
            prepared.execute(params_from_iter(params.iter()))?
        };
        Ok(affected as u64)
    }

    fn begin(&mut self) -> Result<(), Self::Error> {
        debug!("BEGIN");
        self.batch_execute("BEGIN TRANSACTION")
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        debug!("COMMIT");
        self.batch_execute("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        debug!("ROLLBACK");
        self.batch_execute("ROLLBACK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_with_bound_values() {
        let mut client = SqliteClient::open_in_memory().unwrap();
        client.batch_execute("CREATE TABLE t (name TEXT, amount NUMERIC)").unwrap();

        let affected = client
            .execute(
                "INSERT INTO t (name, amount) VALUES (?1, ?2), (?3, ?4)",
                &[
                    SqlValue::text("O'Brien"),
                    SqlValue::Integer(3),
                    SqlValue::Null,
                    SqlValue::text("4.5"),
                ],
            )
            .unwrap();

        assert_eq!(affected, 2);
        let name: String = client.query_scalar("SELECT name FROM t WHERE amount = 3").unwrap();
        assert_eq!(name, "O'Brien");
        let nulls: i64 = client.query_scalar("SELECT COUNT(*) FROM t WHERE name IS NULL").unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut client = SqliteClient::open_in_memory().unwrap();
        client.batch_execute("CREATE TABLE t (id INTEGER)").unwrap();

        client.begin().unwrap();
        client.execute("INSERT INTO t (id) VALUES (1)", &[]).unwrap();
        client.rollback().unwrap();

        let count: i64 = client.query_scalar("SELECT COUNT(*) FROM t").unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bench.db");

        let mut client = SqliteClient::open(&path).unwrap();
        client.batch_execute("CREATE TABLE t (id INTEGER)").unwrap();
        client.execute("INSERT INTO t (id) VALUES (?1)", &[SqlValue::Integer(7)]).unwrap();

        assert!(path.exists());
        let id: i64 = client.query_scalar("SELECT id FROM t").unwrap();
        assert_eq!(id, 7);
    }
}
