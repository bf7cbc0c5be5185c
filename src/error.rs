use thiserror::Error;

use crate::day::Day;

pub type WeightResult<T> = Result<T, WeightError>;

#[derive(Debug, Error)]
pub enum WeightError {
    #[error("batch update requires at least one entry")]
    EmptyBatch,

    #[error("invalid day range: start {start} is after end {end}")]
    InvalidRange { start: Day, end: Day },

    #[error("weight {weight} for day {day} must be a finite, non-negative number")]
    InvalidWeight { day: Day, weight: f64 },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("day {0} has no calendar date")]
    DayOutOfRange(Day),

    #[error("invalid date parameter '{0}'")]
    InvalidDateParam(String),

    #[error("block at day {day_zero} has {len} slots")]
    CorruptBlock { day_zero: Day, len: usize },

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
