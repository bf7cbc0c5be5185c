use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::block::WeightBlock;
use crate::day::Day;
use crate::error::WeightResult;
use crate::models::{UserInfo, UserSettings};
use crate::store::BlockStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Fetch the owner's record, creating it with default settings on first access.
pub async fn get_or_create_user(pool: &PgPool, email: &str) -> WeightResult<UserInfo> {
    let defaults = UserSettings::default();
    let row = sqlx::query(
        r#"
        INSERT INTO weightmeter.users (id, email, scale_resolution, gamma)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET email = EXCLUDED.email
        RETURNING id, email, scale_resolution, gamma
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(defaults.scale_resolution)
    .bind(defaults.gamma)
    .fetch_one(pool)
    .await?;

    Ok(UserInfo {
        id: row.get("id"),
        email: row.get("email"),
        settings: UserSettings {
            scale_resolution: row.get("scale_resolution"),
            gamma: row.get("gamma"),
        },
    })
}

pub async fn update_settings(
    pool: &PgPool,
    user_id: Uuid,
    settings: &UserSettings,
) -> WeightResult<()> {
    settings.validate()?;

    sqlx::query(
        r#"
        UPDATE weightmeter.users
        SET scale_resolution = $2, gamma = $3
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(settings.scale_resolution)
    .bind(settings.gamma)
    .execute(pool)
    .await?;

    Ok(())
}

pub struct PgBlockStore {
    pool: PgPool,
}

impl PgBlockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn block_from_row(row: &sqlx::postgres::PgRow) -> WeightResult<WeightBlock> {
    let day_zero: i64 = row.get("day_zero");
    let entries: Vec<f64> = row.get("weight_entries");
    WeightBlock::from_stored(day_zero, &entries)
}

#[async_trait]
impl BlockStore for PgBlockStore {
    async fn get_or_insert(&self, owner: Uuid, day_zero: Day) -> WeightResult<WeightBlock> {
        let row = sqlx::query(
            r#"
            INSERT INTO weightmeter.weight_blocks (user_id, day_zero, weight_entries)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, day_zero) DO UPDATE
            SET day_zero = EXCLUDED.day_zero
            RETURNING day_zero, weight_entries
            "#,
        )
        .bind(owner)
        .bind(day_zero)
        .bind(WeightBlock::empty(day_zero).to_stored())
        .fetch_one(&self.pool)
        .await?;

        debug!(%owner, day_zero, "fetched block");
        block_from_row(&row)
    }

    async fn put(&self, owner: Uuid, block: &WeightBlock) -> WeightResult<()> {
        sqlx::query(
            r#"
            INSERT INTO weightmeter.weight_blocks (user_id, day_zero, weight_entries)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, day_zero) DO UPDATE
            SET weight_entries = EXCLUDED.weight_entries, updated_at = now()
            "#,
        )
        .bind(owner)
        .bind(block.day_zero())
        .bind(block.to_stored())
        .execute(&self.pool)
        .await?;

        debug!(%owner, day_zero = block.day_zero(), "persisted block");
        Ok(())
    }

    async fn fetch_range(
        &self,
        owner: Uuid,
        first: Day,
        last: Day,
    ) -> WeightResult<Vec<WeightBlock>> {
        let rows = sqlx::query(
            r#"
            SELECT day_zero, weight_entries
            FROM weightmeter.weight_blocks
            WHERE user_id = $1 AND day_zero >= $2 AND day_zero <= $3
            ORDER BY day_zero ASC
            "#,
        )
        .bind(owner)
        .bind(first)
        .bind(last)
        .fetch_all(&self.pool)
        .await?;

        debug!(%owner, first, last, blocks = rows.len(), "fetched block range");
        rows.iter().map(block_from_row).collect()
    }

    async fn latest_at_or_before(
        &self,
        owner: Uuid,
        day_zero: Day,
    ) -> WeightResult<Option<WeightBlock>> {
        let row = sqlx::query(
            r#"
            SELECT day_zero, weight_entries
            FROM weightmeter.weight_blocks
            WHERE user_id = $1 AND day_zero <= $2
            ORDER BY day_zero DESC
            LIMIT 1
            "#,
        )
        .bind(owner)
        .bind(day_zero)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(block_from_row).transpose()
    }
}
