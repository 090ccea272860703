use std::error::Error as StdError;

use crate::database::sql_value::SqlValue;

/// Transactional SQL execution capability the batch core writes through.
///
/// Every call is a blocking round-trip. Implementations decide how the
/// positional `params` map onto their driver.
pub trait ExecutionSink {
    type Error: StdError + Send + Sync + 'static;

    /// Runs one statement and returns the number of affected rows.
    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<u64, Self::Error>;

    fn begin(&mut self) -> Result<(), Self::Error>;

    fn commit(&mut self) -> Result<(), Self::Error>;

    fn rollback(&mut self) -> Result<(), Self::Error>;
}

impl<S: ExecutionSink + ?Sized> ExecutionSink for &mut S {
    type Error = S::Error;

    fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<u64, Self::Error> {
        (**self).execute(statement, params)
    }

    fn begin(&mut self) -> Result<(), Self::Error> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        (**self).rollback()
    }
}
