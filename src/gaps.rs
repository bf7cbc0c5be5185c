use crate::day::Day;
use crate::models::{Entry, Sample};

/// Expands an ascending sparse sequence into one [`Sample`] per calendar day,
/// from the first entry's day to the last, with `None` on days without one.
pub struct FillGaps<I> {
    entries: I,
    next_day: Option<Day>,
    pending: Option<Entry>,
}

impl<I: Iterator<Item = Entry>> FillGaps<I> {
    pub fn new(entries: I) -> Self {
        Self {
            entries,
            next_day: None,
            pending: None,
        }
    }
}

impl<I: Iterator<Item = Entry>> Iterator for FillGaps<I> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let entry = match self.pending.take() {
            Some(entry) => entry,
            None => self.entries.next()?,
        };

        let day = self.next_day.unwrap_or(entry.day);
        assert!(
            entry.day >= day,
            "entries out of order: day {} after {}",
            entry.day,
            day - 1
        );

        self.next_day = Some(day + 1);
        if entry.day == day {
            Some(entry.into())
        } else {
            self.pending = Some(entry);
            Some(Sample::new(day, None))
        }
    }
}
