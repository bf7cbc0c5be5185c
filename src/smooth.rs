use crate::config::DEFAULT_GAMMA;
use crate::models::{Sample, SmoothedPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothOptions {
    pub gamma: f64,
    /// Warm value for the average, typically the trend just before the window.
    pub start: Option<f64>,
    /// Emit `None` for missing inputs instead of carrying the trend through.
    pub propagate_missing: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            start: None,
            propagate_missing: false,
        }
    }
}

impl SmoothOptions {
    pub fn with_gamma(gamma: f64) -> Self {
        Self {
            gamma,
            ..Self::default()
        }
    }
}

/// Exponentially weighted moving average over a gappy sequence.
///
/// Leading gaps always smooth to `None`: the recurrence only starts once a
/// real value has been seen (or `start` was given).
pub struct Smoothed<I> {
    samples: I,
    options: SmoothOptions,
    smoothed: Option<f64>,
}

impl<I: Iterator<Item = Sample>> Smoothed<I> {
    pub fn new(samples: I, options: SmoothOptions) -> Self {
        Self {
            samples,
            smoothed: options.start,
            options,
        }
    }
}

impl<I: Iterator<Item = Sample>> Iterator for Smoothed<I> {
    type Item = SmoothedPoint;

    fn next(&mut self) -> Option<SmoothedPoint> {
        let Sample { day, value } = self.samples.next()?;
        if self.smoothed.is_none() {
            self.smoothed = value;
        }

        let smoothed = match (value, self.smoothed) {
            (Some(raw), Some(previous)) => {
                let gamma = self.options.gamma;
                let next = gamma * previous + (1.0 - gamma) * raw;
                self.smoothed = Some(next);
                Some(next)
            }
            (None, _) if self.options.propagate_missing => None,
            (_, previous) => previous,
        };

        Some(SmoothedPoint {
            day,
            raw: value,
            smoothed,
        })
    }
}
