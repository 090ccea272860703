//! Limit-aware batch INSERT and staged bulk UPDATE synthesis.
//!
//! Rows are handed over in memory, split into batches that respect the
//! target dialect's parameter and statement limits, and written either as
//! multi-row INSERTs or through a temporary staging table joined on a key.

pub mod database;
pub mod manifest;

mod helpers;
pub use helpers::generate_random_id;

mod logger;
pub use logger::{setup_info_logger, setup_logger, setup_quiet_logger};

pub use database::batch_operations::{
    build_insert, BulkInsertBuilder, BulkWriteSummary, BulkWriter, StagedBulkUpdater,
    StagingArea, Statement,
};
pub use database::dialect::{DialectLimits, SqlDialect};
pub use database::encoder::{encode_numeric, encode_text, encode_value, is_numeric};
pub use database::error::{BulkWriteError, ConfigurationError, ExecutionError, ValidationError};
pub use database::planner::{plan, BatchPlan, EncodingMode, DEFAULT_LITERAL_BATCH_SIZE};
pub use database::sink::ExecutionSink;
pub use database::sql_value::{ColumnKind, ColumnSpec, Row, SqlValue};
pub use database::sqlite::SqliteClient;
pub use manifest::config::{read_config, BulkConfig, ReadConfigError};

// export 3rd party dependencies
pub use tracing::level_filters::LevelFilter;
