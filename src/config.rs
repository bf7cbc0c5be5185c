use anyhow::Context;

use crate::day::Day;

/// Chart and report windows start two weeks back unless told otherwise.
pub const DEFAULT_START_PARAM: &str = "-14";
/// Pounds either side of the latest weight offered as entry choices.
pub const DEFAULT_POUND_SELECTION: f64 = 5.0;

pub const MOBILE_IMG_WIDTH: u32 = 300;
pub const MOBILE_IMG_HEIGHT: u32 = 200;
pub const MAX_GRAPH_SAMPLES: usize = 100;
pub const MAX_MOBILE_SAMPLES: usize = MOBILE_IMG_WIDTH as usize / 4;

/// Lookback used to warm up the trend before the visible window.
pub const PRIME_DAYS: i64 = 14;

/// Ordinal of 1900-01-01, the start of an unbounded range.
pub const EARLIEST_DAY: Day = 693_596;

pub const DEFAULT_SCALE_RESOLUTION: f64 = 0.5;
/// Finest accepted scale resolution; keeps entry choice lists small.
pub const MIN_SCALE_RESOLUTION: f64 = 0.01;
pub const DEFAULT_GAMMA: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub user_email: String,
}

impl AppConfig {
    pub fn load(user_email: String) -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        anyhow::ensure!(
            user_email.contains('@'),
            "owner '{user_email}' must be an email address"
        );

        Ok(Self {
            database_url,
            user_email,
        })
    }
}
