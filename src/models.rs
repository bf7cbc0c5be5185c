use uuid::Uuid;

use crate::config::{DEFAULT_GAMMA, DEFAULT_SCALE_RESOLUTION, MIN_SCALE_RESOLUTION};
use crate::day::Day;
use crate::error::{WeightError, WeightResult};

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub settings: UserSettings,
}

/// Per-owner tuning consumed by the trend pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserSettings {
    /// Granularity of manual weight entry.
    pub scale_resolution: f64,
    /// Decay factor of the exponential moving average.
    pub gamma: f64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            scale_resolution: DEFAULT_SCALE_RESOLUTION,
            gamma: DEFAULT_GAMMA,
        }
    }
}

impl UserSettings {
    pub fn validate(&self) -> WeightResult<()> {
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(WeightError::InvalidSettings(format!(
                "gamma {} must lie strictly between 0 and 1",
                self.gamma
            )));
        }
        if !(self.scale_resolution.is_finite() && self.scale_resolution >= MIN_SCALE_RESOLUTION) {
            return Err(WeightError::InvalidSettings(format!(
                "scale resolution {} must be at least {MIN_SCALE_RESOLUTION}",
                self.scale_resolution
            )));
        }
        Ok(())
    }
}

/// A recorded weight for one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub day: Day,
    pub weight: f64,
}

impl Entry {
    pub fn new(day: Day, weight: f64) -> Self {
        Self { day, weight }
    }
}

/// A day in a dense or downsampled sequence; `None` marks a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub day: Day,
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(day: Day, value: Option<f64>) -> Self {
        Self { day, value }
    }
}

impl From<Entry> for Sample {
    fn from(entry: Entry) -> Self {
        Self::new(entry.day, Some(entry.weight))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPoint {
    pub day: Day,
    pub raw: Option<f64>,
    pub smoothed: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = UserSettings::default();
        assert_eq!(settings.scale_resolution, 0.5);
        assert_eq!(settings.gamma, 0.9);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn gamma_must_be_strictly_inside_unit_interval() {
        for gamma in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let settings = UserSettings {
                gamma,
                ..UserSettings::default()
            };
            assert!(settings.validate().is_err(), "gamma {gamma} accepted");
        }
    }

    #[test]
    fn resolution_must_be_positive() {
        let settings = UserSettings {
            scale_resolution: 0.0,
            ..UserSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(WeightError::InvalidSettings(_))
        ));
    }

    #[test]
    fn resolution_has_a_floor() {
        for scale_resolution in [1e-12, 0.005, f64::INFINITY] {
            let settings = UserSettings {
                scale_resolution,
                ..UserSettings::default()
            };
            assert!(settings.validate().is_err(), "{scale_resolution} accepted");
        }
        let finest = UserSettings {
            scale_resolution: 0.01,
            ..UserSettings::default()
        };
        assert!(finest.validate().is_ok());
    }
}
