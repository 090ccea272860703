use std::error::Error as StdError;

/// Invalid limits or batch settings. Fatal, surfaced before any statement runs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Column count must be greater than zero")]
    NoColumns,

    #[error("max_bound_parameters must be greater than zero")]
    NoBoundParameters,

    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("max_statement_length must be greater than zero when set")]
    ZeroStatementLength,

    #[error("Batch size {batch_size} exceeds the {dialect} limit of {limit} compound SELECT terms")]
    CompoundSelectLimitExceeded { dialect: &'static str, batch_size: usize, limit: usize },

    #[error("union_separator must not be empty")]
    EmptyUnionSeparator,

    #[error("Unknown dialect `{0}`, expected one of sqlserver, postgres, mysql, sqlite")]
    UnknownDialect(String),
}

/// Malformed batch shape. No statement has been issued when this is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Batch is empty, filter empty batches before building a statement")]
    EmptyBatch,

    #[error("No columns given")]
    NoColumns,

    #[error("Row {row} has {found} fields but {expected} columns were given")]
    ArityMismatch { row: usize, expected: usize, found: usize },

    #[error("Column {0} is listed more than once")]
    DuplicateColumn(String),

    #[error("Column at position {0} has an empty name")]
    EmptyIdentifier(usize),

    #[error("No changed columns given for the update")]
    NoChangedColumns,

    #[error("Key column {0} must not also be a changed column")]
    KeyColumnChanged(String),

    #[error("Statement is {length} characters long, the dialect allows {limit}")]
    StatementTooLong { length: usize, limit: usize },
}

/// A data store call failed. Carries the statement that was running.
#[derive(thiserror::Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct ExecutionError {
    pub stage: &'static str,
    pub statement: String,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl ExecutionError {
    pub fn new<E>(stage: &'static str, statement: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ExecutionError { stage, statement: statement.into(), source: Box::new(source) }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BulkWriteError {
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Execution(#[from] ExecutionError),
}
