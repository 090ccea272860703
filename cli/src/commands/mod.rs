pub mod bench;
pub mod sql;
