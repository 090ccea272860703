mod client;

pub use client::{connection_string, SqliteClient, SqliteConnectionError, SqliteError};
