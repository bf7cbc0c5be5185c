use crate::day::Day;
use crate::error::{WeightError, WeightResult};
use crate::models::Entry;

/// Never change this: stored blocks depend on it.
pub const BLOCK_SIZE: usize = 35;
const BLOCK_DAYS: Day = BLOCK_SIZE as Day;

/// Value written to storage for a day with no entry.
pub const MISSING_SENTINEL: f64 = -1.0;

pub fn day_zero(day: Day) -> Day {
    day - day.rem_euclid(BLOCK_DAYS)
}

pub fn block_offset(day: Day) -> usize {
    let offset = day - day_zero(day);
    assert!((0..BLOCK_DAYS).contains(&offset), "offset {offset} outside block");
    offset as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightBlock {
    day_zero: Day,
    slots: [Option<f64>; BLOCK_SIZE],
}

impl WeightBlock {
    pub fn empty(day_zero: Day) -> Self {
        assert_eq!(day_zero.rem_euclid(BLOCK_DAYS), 0, "unaligned block start {day_zero}");
        Self {
            day_zero,
            slots: [None; BLOCK_SIZE],
        }
    }

    /// Rebuilds a block from its stored form, where negative values mean
    /// "no entry".
    pub fn from_stored(day_zero: Day, stored: &[f64]) -> WeightResult<Self> {
        if stored.len() != BLOCK_SIZE || day_zero.rem_euclid(BLOCK_DAYS) != 0 {
            return Err(WeightError::CorruptBlock {
                day_zero,
                len: stored.len(),
            });
        }

        let mut block = Self::empty(day_zero);
        for (slot, &value) in block.slots.iter_mut().zip(stored) {
            *slot = (value >= 0.0).then_some(value);
        }
        Ok(block)
    }

    pub fn to_stored(&self) -> Vec<f64> {
        self.slots
            .iter()
            .map(|slot| slot.unwrap_or(MISSING_SENTINEL))
            .collect()
    }

    pub fn day_zero(&self) -> Day {
        self.day_zero
    }

    pub fn contains(&self, day: Day) -> bool {
        day_zero(day) == self.day_zero
    }

    pub fn get(&self, day: Day) -> Option<f64> {
        assert!(self.contains(day), "day {day} outside block {}", self.day_zero);
        self.slots[block_offset(day)]
    }

    pub fn set(&mut self, day: Day, weight: Option<f64>) {
        assert!(self.contains(day), "day {day} outside block {}", self.day_zero);
        self.slots[block_offset(day)] = weight;
    }

    /// Latest recorded entry, scanning from the last slot backwards.
    pub fn latest(&self) -> Option<Entry> {
        self.slots
            .iter()
            .enumerate()
            .rev()
            .find_map(|(offset, slot)| slot.map(|w| Entry::new(self.day_zero + offset as Day, w)))
    }

    /// Recorded entries inside `[start, end]`, ascending.
    pub fn into_entries(self, start: Day, end: Day) -> impl Iterator<Item = Entry> {
        let day_zero = self.day_zero;
        self.slots
            .into_iter()
            .enumerate()
            .filter_map(move |(offset, slot)| {
                let day = day_zero + offset as Day;
                match slot {
                    Some(weight) if (start..=end).contains(&day) => Some(Entry::new(day, weight)),
                    _ => None,
                }
            })
    }
}
