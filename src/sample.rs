use tracing::debug;

use crate::day::Day;
use crate::gaps::FillGaps;
use crate::models::{Entry, Sample};

/// Points of the midpoint-rasterised line from `(x1, y1)` to `(x2, y2)`,
/// one per x.
#[derive(Debug, Clone)]
pub struct ScanLine {
    x: i64,
    x2: i64,
    y: i64,
    d: i64,
    dx: i64,
    dy: i64,
}

impl ScanLine {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        assert!(x2 >= x1, "scan line runs backwards");
        assert!(x2 - x1 >= y2 - y1, "scan line slope exceeds one");

        let dx = x2 - x1;
        let dy = y2 - y1;
        Self {
            x: x1,
            x2,
            y: y1,
            d: 2 * dy - dx,
            dx,
            dy,
        }
    }
}

impl Iterator for ScanLine {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<(i64, i64)> {
        if self.x > self.x2 {
            return None;
        }

        let point = (self.x, self.y);
        if self.d > 0 {
            self.d += 2 * (self.dy - self.dx);
            self.y += 1;
        } else {
            self.d += 2 * self.dy;
        }
        self.x += 1;
        Some(point)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    sum: f64,
    count: u32,
}

impl Bucket {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn average(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

enum State<I> {
    Start {
        days: I,
        start: Day,
        end: Day,
        num_samples: usize,
    },
    Copy {
        days: I,
        end: Day,
        remaining: usize,
    },
    Reduce {
        days: I,
        line: ScanLine,
        end: Day,
        index: i64,
        bucket: Bucket,
    },
    Done,
}

/// Lazy downsampler produced by [`sample_entries`].
pub struct Sampled<I> {
    state: State<I>,
}

/// Reduce `entries` to at most `num_samples` points spanning `[start, end]`.
///
/// Days before `start` are skipped, and the span actually sampled begins at
/// the first day reached. When no reduction is needed the gap-filled days are
/// passed through unchanged.
pub fn sample_entries<I>(
    entries: I,
    start: Day,
    end: Day,
    num_samples: usize,
) -> Sampled<FillGaps<I::IntoIter>>
where
    I: IntoIterator<Item = Entry>,
{
    Sampled {
        state: State::Start {
            days: FillGaps::new(entries.into_iter()),
            start,
            end,
            num_samples,
        },
    }
}

impl<I: Iterator<Item = Sample>> Sampled<I> {
    fn begin(mut days: I, start: Day, end: Day, num_samples: usize) -> (State<I>, Option<Sample>) {
        let Some(first) = days.by_ref().find(|sample| sample.day >= start) else {
            return (State::Done, None);
        };
        if num_samples == 0 || first.day > end {
            return (State::Done, None);
        }

        debug!(start = first.day, "real sample start");
        let num_dates = end - first.day + 1;
        if num_samples as i64 >= num_dates {
            let state = State::Copy {
                days,
                end,
                remaining: num_samples - 1,
            };
            return (state, Some(first));
        }

        let use_samples = num_samples as i64;
        debug!(num_dates, use_samples, "reducing samples");
        let mut line = ScanLine::new(first.day, 0, end, use_samples - 1);
        // The first point is always (first.day, 0) and pairs with `first`.
        line.next();

        let mut bucket = Bucket::default();
        bucket.add(first.value);
        let state = State::Reduce {
            days,
            line,
            end,
            index: 0,
            bucket,
        };
        (state, None)
    }
}

impl<I: Iterator<Item = Sample>> Iterator for Sampled<I> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Start {
                    days,
                    start,
                    end,
                    num_samples,
                } => {
                    let (state, first) = Self::begin(days, start, end, num_samples);
                    self.state = state;
                    if first.is_some() {
                        return first;
                    }
                }
                State::Copy {
                    mut days,
                    end,
                    remaining,
                } => {
                    if remaining == 0 {
                        return None;
                    }
                    let sample = days.next().filter(|sample| sample.day <= end)?;
                    self.state = State::Copy {
                        days,
                        end,
                        remaining: remaining - 1,
                    };
                    return Some(sample);
                }
                State::Reduce {
                    mut days,
                    mut line,
                    end,
                    index,
                    mut bucket,
                } => match (days.next(), line.next()) {
                    (Some(sample), Some((day, sample_index))) => {
                        assert_eq!(sample.day, day, "sampled days out of step with the scan line");

                        let emitted = (sample_index != index).then(|| {
                            Sample::new(day - 1, std::mem::take(&mut bucket).average())
                        });
                        bucket.add(sample.value);
                        self.state = State::Reduce {
                            days,
                            line,
                            end,
                            index: sample_index,
                            bucket,
                        };
                        if emitted.is_some() {
                            return emitted;
                        }
                    }
                    _ => return Some(Sample::new(end, bucket.average())),
                },
                State::Done => return None,
            }
        }
    }
}
