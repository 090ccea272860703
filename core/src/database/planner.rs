//! Batch sizing and partitioning of a row sequence.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::database::dialect::{DialectLimits, SqlDialect};
use crate::database::error::ConfigurationError;

/// Rows per literal-value statement unless configured otherwise.
pub const DEFAULT_LITERAL_BATCH_SIZE: usize = 500;

/// How row values travel to the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingMode {
    /// One placeholder per field, capped by `max_bound_parameters`.
    BoundParameters,
    /// Escaped literals in a `SELECT ... UNION ALL SELECT ...` row list.
    #[default]
    LiteralValues,
}

/// Computes the number of rows per statement.
///
/// In bound-parameter mode the size is derived from the parameter ceiling and
/// the column count. In literal mode it is the caller supplied target, which
/// only has to respect the dialect's compound SELECT limit when there is one.
pub fn batch_size(
    dialect: SqlDialect,
    column_count: usize,
    limits: &DialectLimits,
    mode: EncodingMode,
    literal_batch_size: usize,
) -> Result<usize, ConfigurationError> {
    if column_count == 0 {
        return Err(ConfigurationError::NoColumns);
    }
    limits.validate()?;

    match mode {
        EncodingMode::BoundParameters => Ok((limits.max_bound_parameters / column_count).max(1)),
        EncodingMode::LiteralValues => {
            if literal_batch_size == 0 {
                return Err(ConfigurationError::ZeroBatchSize);
            }
            if let Some(limit) = limits.max_compound_select {
                if literal_batch_size > limit {
                    return Err(ConfigurationError::CompoundSelectLimitExceeded {
                        dialect: dialect.name(),
                        batch_size: literal_batch_size,
                        limit,
                    });
                }
            }
            Ok(literal_batch_size)
        }
    }
}

/// Plans the batches for `total_rows` rows.
pub fn plan(
    dialect: SqlDialect,
    total_rows: usize,
    column_count: usize,
    limits: &DialectLimits,
    mode: EncodingMode,
    literal_batch_size: usize,
) -> Result<BatchPlan, ConfigurationError> {
    let batch_size = batch_size(dialect, column_count, limits, mode, literal_batch_size)?;
    Ok(BatchPlan { total_rows, batch_size })
}

/// Contiguous, gap free partition of `[0, total_rows)`.
///
/// The plan is a value: iterating it does not consume it, so the same plan can
/// be walked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total_rows: usize,
    batch_size: usize,
}

impl BatchPlan {
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batch_count(&self) -> usize {
        self.total_rows.div_ceil(self.batch_size)
    }

    pub fn iter(&self) -> BatchRanges {
        BatchRanges { next_start: 0, total_rows: self.total_rows, batch_size: self.batch_size }
    }
}

impl IntoIterator for BatchPlan {
    type Item = Range<usize>;
    type IntoIter = BatchRanges;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &BatchPlan {
    type Item = Range<usize>;
    type IntoIter = BatchRanges;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct BatchRanges {
    next_start: usize,
    total_rows: usize,
    batch_size: usize,
}

impl Iterator for BatchRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.total_rows {
            return None;
        }
        let start = self.next_start;
        let end = start.saturating_add(self.batch_size).min(self.total_rows);
        self.next_start = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total_rows - self.next_start.min(self.total_rows))
            .div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchRanges {}
