use async_trait::async_trait;
use uuid::Uuid;

use crate::block::WeightBlock;
use crate::day::Day;
use crate::error::WeightResult;

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Fetch the block starting at `day_zero`, creating an empty one if the
    /// owner has none there yet.
    async fn get_or_insert(&self, owner: Uuid, day_zero: Day) -> WeightResult<WeightBlock>;

    /// Persist the whole block.
    async fn put(&self, owner: Uuid, block: &WeightBlock) -> WeightResult<()>;

    /// Blocks with `first <= day_zero <= last`, ascending.
    async fn fetch_range(
        &self,
        owner: Uuid,
        first: Day,
        last: Day,
    ) -> WeightResult<Vec<WeightBlock>>;

    /// The block with the largest `day_zero <= day_zero`, if any.
    async fn latest_at_or_before(&self, owner: Uuid, day_zero: Day)
        -> WeightResult<Option<WeightBlock>>;
}
