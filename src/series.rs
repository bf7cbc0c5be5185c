use tracing::{debug, info};
use uuid::Uuid;

use crate::block::{day_zero, WeightBlock};
use crate::day::Day;
use crate::error::{WeightError, WeightResult};
use crate::models::Entry;
use crate::store::BlockStore;

pub struct TimeSeries<'a, S: BlockStore> {
    store: &'a S,
    owner: Uuid,
}

pub fn is_valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight >= 0.0
}

fn check_weight(day: Day, weight: f64) -> WeightResult<()> {
    if is_valid_weight(weight) {
        Ok(())
    } else {
        Err(WeightError::InvalidWeight { day, weight })
    }
}

impl<'a, S: BlockStore> TimeSeries<'a, S> {
    pub fn new(store: &'a S, owner: Uuid) -> Self {
        Self { store, owner }
    }

    pub async fn update(&self, day: Day, weight: f64) -> WeightResult<()> {
        check_weight(day, weight)?;
        self.write(day, Some(weight)).await
    }

    /// Remove the entry for `day`. The block itself is kept.
    pub async fn clear(&self, day: Day) -> WeightResult<()> {
        self.write(day, None).await
    }

    async fn write(&self, day: Day, weight: Option<f64>) -> WeightResult<()> {
        let mut block = self.store.get_or_insert(self.owner, day_zero(day)).await?;
        debug!(day, previous = ?block.get(day), ?weight, "writing entry");
        block.set(day, weight);
        self.store.put(self.owner, &block).await
    }

    /// Write many entries, persisting each touched block exactly once.
    pub async fn batch_update(&self, entries: Vec<Entry>) -> WeightResult<usize> {
        let writes = entries
            .into_iter()
            .map(|entry| (entry.day, Some(entry.weight)))
            .collect();
        self.batch_write(writes).await
    }

    /// Write or clear many days, persisting each touched block exactly once.
    ///
    /// When a day appears more than once, the largest weight wins and a clear
    /// only wins if the day has no weight in the batch. Blocks are persisted
    /// independently: a failure part way through leaves the earlier blocks
    /// committed.
    pub async fn batch_write(
        &self,
        mut writes: Vec<(Day, Option<f64>)>,
    ) -> WeightResult<usize> {
        if writes.is_empty() {
            return Err(WeightError::EmptyBatch);
        }
        for &(day, weight) in &writes {
            if let Some(weight) = weight {
                check_weight(day, weight)?;
            }
        }
        writes.sort_by(|a, b| {
            a.0.cmp(&b.0).then_with(|| match (a.1, b.1) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            })
        });

        let mut current: Option<WeightBlock> = None;
        let mut flushed = 0;
        for &(day, weight) in &writes {
            let block = match current.take() {
                Some(block) if block.contains(day) => current.insert(block),
                previous => {
                    if let Some(previous) = previous {
                        self.store.put(self.owner, &previous).await?;
                        flushed += 1;
                    }
                    let next = self.store.get_or_insert(self.owner, day_zero(day)).await?;
                    current.insert(next)
                }
            };
            block.set(day, weight);
        }

        // The loop only flushes on a block change; the last block is still pending.
        if let Some(block) = current {
            self.store.put(self.owner, &block).await?;
            flushed += 1;
        }

        info!(
            owner = %self.owner,
            writes = writes.len(),
            blocks = flushed,
            "batch write"
        );
        Ok(flushed)
    }

    /// Recorded entries with `start <= day <= end`, ascending. Days without an
    /// entry are absent.
    pub async fn query(
        &self,
        start: Day,
        end: Day,
    ) -> WeightResult<impl Iterator<Item = Entry>> {
        if start > end {
            return Err(WeightError::InvalidRange { start, end });
        }

        let blocks = self
            .store
            .fetch_range(self.owner, day_zero(start), day_zero(end))
            .await?;
        debug!(start, end, blocks = blocks.len(), "query");

        Ok(blocks
            .into_iter()
            .flat_map(move |block| block.into_entries(start, end)))
    }

    /// Latest entry in the most recent block at or before `today`'s block.
    ///
    /// Only that single block is inspected: if it holds no entries, `None` is
    /// returned even when an earlier block has data.
    pub async fn most_recent_entry(&self, today: Day) -> WeightResult<Option<Entry>> {
        let block = self
            .store
            .latest_at_or_before(self.owner, day_zero(today))
            .await?;
        Ok(block.and_then(|block| block.latest()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::store::memory::MemoryBlockStore;

    fn entries(series: impl Iterator<Item = Entry>) -> Vec<(Day, f64)> {
        series.map(|e| (e.day, e.weight)).collect()
    }

    #[tokio::test]
    async fn update_then_query_round_trips() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        series.update(739_000, 181.5).await.unwrap();
        let found = entries(series.query(738_990, 739_010).await.unwrap());
        assert_eq!(found, vec![(739_000, 181.5)]);
    }

    #[tokio::test]
    async fn overwrite_keeps_latest_value() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        series.update(100, 150.0).await.unwrap();
        series.update(100, 152.0).await.unwrap();
        let found = entries(series.query(100, 100).await.unwrap());
        assert_eq!(found, vec![(100, 152.0)]);
    }

    #[tokio::test]
    async fn negative_weight_is_rejected_before_writing() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        let result = series.update(10, -1.0).await;
        assert!(matches!(
            result,
            Err(WeightError::InvalidWeight { day: 10, .. })
        ));
        assert_eq!(store.block_count(), 0);
    }

    #[tokio::test]
    async fn non_finite_weights_are_rejected() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        for weight in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(matches!(
                series.update(739_000, weight).await,
                Err(WeightError::InvalidWeight { day: 739_000, .. })
            ));
        }
        let batch = vec![Entry::new(1, 180.0), Entry::new(2, f64::INFINITY)];
        assert!(series.batch_update(batch).await.is_err());
        assert_eq!(store.block_count(), 0);
    }

    #[tokio::test]
    async fn clear_removes_entry_but_keeps_block() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        series.update(40, 170.0).await.unwrap();
        series.clear(40).await.unwrap();
        assert!(entries(series.query(35, 69).await.unwrap()).is_empty());
        assert_eq!(store.block_count(), 1);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        assert!(matches!(
            series.query(20, 10).await,
            Err(WeightError::InvalidRange { start: 20, end: 10 })
        ));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        assert!(matches!(
            series.batch_update(Vec::new()).await,
            Err(WeightError::EmptyBatch)
        ));
    }

    #[tokio::test]
    async fn batch_persists_each_block_once() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        let batch = vec![Entry::new(35, 3.0), Entry::new(0, 1.0), Entry::new(34, 2.0)];
        let flushed = series.batch_update(batch).await.unwrap();

        assert_eq!(flushed, 2);
        assert_eq!(store.puts(), vec![0, 35]);
        assert_eq!(
            entries(series.query(0, 35).await.unwrap()),
            vec![(0, 1.0), (34, 2.0), (35, 3.0)]
        );
    }

    #[tokio::test]
    async fn batch_matches_individual_updates() {
        let days = [3, 800, 41, 36, 70, 69, 104, 105, 2];
        let batch: Vec<Entry> = days
            .iter()
            .map(|&d| Entry::new(d, 150.0 + d as f64 / 10.0))
            .collect();

        let batch_store = MemoryBlockStore::default();
        let single_store = MemoryBlockStore::default();
        let owner = Uuid::new_v4();
        let batched = TimeSeries::new(&batch_store, owner);
        let single = TimeSeries::new(&single_store, owner);

        batched.batch_update(batch.clone()).await.unwrap();
        for entry in batch.iter().rev() {
            single.update(entry.day, entry.weight).await.unwrap();
        }

        let (lo, hi) = (2, 800);
        let from_batch = entries(batched.query(lo, hi).await.unwrap());
        let from_single = entries(single.query(lo, hi).await.unwrap());
        assert_eq!(from_batch, from_single);
        assert_eq!(from_batch.len(), days.len());

        let touched: BTreeSet<Day> = days.iter().map(|&d| day_zero(d)).collect();
        assert_eq!(batch_store.puts().len(), touched.len());
    }

    #[tokio::test]
    async fn batch_write_mixes_values_and_clears_in_one_put() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());
        series.update(5, 170.0).await.unwrap();

        let writes = vec![
            (0, Some(180.0)),
            (0, None),
            (1, None),
            (5, None),
            (3, Some(181.0)),
        ];
        let flushed = series.batch_write(writes).await.unwrap();

        assert_eq!(flushed, 1);
        assert_eq!(store.puts(), vec![0, 0]);
        let found = entries(series.query(0, 34).await.unwrap());
        assert_eq!(found, vec![(0, 180.0), (3, 181.0)]);
    }

    #[tokio::test]
    async fn largest_weight_wins_within_a_day() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        let writes = vec![(7, Some(182.0)), (7, None), (7, Some(181.5))];
        series.batch_write(writes).await.unwrap();
        let found = entries(series.query(7, 7).await.unwrap());
        assert_eq!(found, vec![(7, 182.0)]);
    }

    #[tokio::test]
    async fn owners_do_not_see_each_others_blocks() {
        let store = MemoryBlockStore::default();
        let alice = TimeSeries::new(&store, Uuid::new_v4());
        let bob = TimeSeries::new(&store, Uuid::new_v4());

        alice.update(50, 140.0).await.unwrap();
        assert!(entries(bob.query(0, 100).await.unwrap()).is_empty());
        assert_eq!(bob.most_recent_entry(100).await.unwrap(), None);
    }

    #[tokio::test]
    async fn most_recent_entry_reads_latest_slot() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        series.update(71, 160.0).await.unwrap();
        series.update(80, 159.0).await.unwrap();
        series.update(200, 158.0).await.unwrap();

        let latest = series.most_recent_entry(104).await.unwrap();
        assert_eq!(latest, Some(Entry::new(80, 159.0)));
        let latest = series.most_recent_entry(300).await.unwrap();
        assert_eq!(latest, Some(Entry::new(200, 158.0)));
        assert_eq!(series.most_recent_entry(10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn most_recent_entry_only_checks_one_block() {
        let store = MemoryBlockStore::default();
        let series = TimeSeries::new(&store, Uuid::new_v4());

        series.update(10, 165.0).await.unwrap();
        series.update(40, 164.0).await.unwrap();
        series.clear(40).await.unwrap();

        assert_eq!(series.most_recent_entry(60).await.unwrap(), None);
    }
}
