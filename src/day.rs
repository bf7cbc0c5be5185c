use chrono::{Datelike, NaiveDate};

use crate::config::EARLIEST_DAY;
use crate::error::{WeightError, WeightResult};

pub type Day = i64;

pub fn to_day(date: NaiveDate) -> Day {
    i64::from(date.num_days_from_ce())
}

pub fn to_date(day: Day) -> WeightResult<NaiveDate> {
    i32::try_from(day)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or(WeightError::DayOutOfRange(day))
}

/// Resolves a single range parameter.
///
/// `*` is unbounded, `n <= 0` is relative to `today`, a positive integer is an
/// absolute ordinal, and anything else must be `YYYY-MM-DD`.
pub fn parse_day_param(param: &str, today: Day) -> WeightResult<Option<Day>> {
    let param = param.trim();
    if param == "*" {
        return Ok(None);
    }

    if let Ok(value) = param.parse::<i64>() {
        return Ok(Some(if value <= 0 { today + value } else { value }));
    }

    NaiveDate::parse_from_str(param, "%Y-%m-%d")
        .map(|date| Some(to_day(date)))
        .map_err(|_| WeightError::InvalidDateParam(param.to_string()))
}

pub fn date_range(start: &str, end: &str, today: Day) -> WeightResult<(Day, Day)> {
    let start_day = parse_day_param(start, today)?.unwrap_or(EARLIEST_DAY);
    let end_day = parse_day_param(end, today)?.unwrap_or(today);
    Ok((start_day, end_day))
}
