use tracing::debug;

use crate::day::Day;
use crate::error::WeightResult;
use crate::gaps::FillGaps;
use crate::models::{Entry, Sample, SmoothedPoint};
use crate::sample::{sample_entries, Sampled};
use crate::series::TimeSeries;
use crate::smooth::{SmoothOptions, Smoothed};
use crate::store::BlockStore;

pub trait TrendExt: Iterator + Sized {
    fn fill_gaps(self) -> FillGaps<Self>
    where
        Self: Iterator<Item = Entry>,
    {
        FillGaps::new(self)
    }

    fn sample(self, start: Day, end: Day, num_samples: usize) -> Sampled<FillGaps<Self>>
    where
        Self: Iterator<Item = Entry>,
    {
        sample_entries(self, start, end, num_samples)
    }

    fn smooth(self, options: SmoothOptions) -> Smoothed<Self>
    where
        Self: Iterator<Item = Sample>,
    {
        Smoothed::new(self, options)
    }
}

impl<I: Iterator> TrendExt for I {}

#[derive(Debug, Clone, Copy)]
pub struct TrendRequest {
    pub start: Day,
    pub end: Day,
    pub samples: usize,
    pub gamma: f64,
    /// Days before `start` used to warm up the average; below 2 disables priming.
    pub prime_days: i64,
}

/// Trend value carried into `start` from the `prime_days` before it.
async fn prime<S: BlockStore>(
    series: &TimeSeries<'_, S>,
    request: &TrendRequest,
) -> WeightResult<Option<f64>> {
    if request.prime_days < 2 {
        return Ok(None);
    }

    let last = series
        .query(request.start - request.prime_days, request.start - 1)
        .await?
        .fill_gaps()
        .smooth(SmoothOptions::with_gamma(request.gamma))
        .filter_map(|point| point.smoothed)
        .last();
    debug!(prime = ?last, "primed trend");
    Ok(last)
}

pub async fn trend<S: BlockStore>(
    series: &TimeSeries<'_, S>,
    request: TrendRequest,
) -> WeightResult<Vec<SmoothedPoint>> {
    let start = prime(series, &request).await?;
    let options = SmoothOptions {
        gamma: request.gamma,
        start,
        propagate_missing: false,
    };

    let points: Vec<SmoothedPoint> = series
        .query(request.start, request.end)
        .await?
        .sample(request.start, request.end, request.samples)
        .smooth(options)
        .collect();
    debug!(points = points.len(), "trend computed");
    Ok(points)
}
