pub mod batch_operations;
pub mod dialect;
pub mod encoder;
pub mod error;
pub mod planner;
pub mod sink;
pub mod sql_value;
pub mod sqlite;
