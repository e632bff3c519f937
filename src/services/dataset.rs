use std::collections::HashMap;

use async_trait::async_trait;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{Content, Interaction, InteractionKind, NewInteraction};

/// Seed for the simulated dataset. Changing it changes which dataset is
/// generated, so reproducible fixtures depend on this exact value.
pub const SIMULATION_SEED: u64 = 42;

/// Fraction of the user×content grid covered by simulated interactions.
const SIMULATION_DENSITY: f64 = 0.3;

/// One materialized snapshot of source data, as handed to the model build.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub interactions: Vec<Interaction>,
    pub contents: Vec<Content>,
}

/// Source of interaction and content records.
///
/// The recommendation core treats every source identically once the
/// snapshot is materialized; failures here are the store's to report, never
/// retried by the core.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Materializes a full snapshot, ordered oldest interaction first.
    async fn load(&self) -> AppResult<DatasetSnapshot>;

    /// Appends a live interaction to the underlying source.
    async fn record(&self, interaction: NewInteraction) -> AppResult<()>;
}

/// Collapses duplicate (user, content) pairs, keeping the most recent
/// rating. Input order is recency order: later entries win.
pub fn dedup_keep_latest(interactions: Vec<Interaction>) -> Vec<Interaction> {
    let mut positions: HashMap<(i64, i64), usize> = HashMap::new();
    let mut result: Vec<Interaction> = Vec::with_capacity(interactions.len());

    for interaction in interactions {
        let key = (interaction.user_id, interaction.content_id);
        match positions.get(&key) {
            Some(&pos) => result[pos] = interaction,
            None => {
                positions.insert(key, result.len());
                result.push(interaction);
            }
        }
    }

    result
}

/// Seeded synthetic dataset, used when no database is configured.
///
/// Each user interacts with roughly 30% of the contents; ratings 1–5 are
/// drawn with weights favoring the upper end.
pub struct SimulatedDataset {
    n_users: usize,
    n_contents: usize,
    seed: u64,
}

impl SimulatedDataset {
    pub fn new(n_users: usize, n_contents: usize) -> Self {
        Self::with_seed(n_users, n_contents, SIMULATION_SEED)
    }

    pub fn with_seed(n_users: usize, n_contents: usize, seed: u64) -> Self {
        Self {
            n_users,
            n_contents,
            seed,
        }
    }

    fn generate(&self) -> AppResult<DatasetSnapshot> {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let rating_weights = [0.1, 0.1, 0.2, 0.3, 0.3];
        let rating_dist = WeightedIndex::new(rating_weights)
            .map_err(|e| AppError::Internal(format!("invalid rating weights: {}", e)))?;

        let n_interactions =
            ((self.n_users * self.n_contents) as f64 * SIMULATION_DENSITY) as usize;

        let mut interactions = Vec::with_capacity(n_interactions);
        for _ in 0..n_interactions {
            let user_id = rng.gen_range(1..=self.n_users as i64);
            let content_id = rng.gen_range(1..=self.n_contents as i64);
            let rating = (rating_dist.sample(&mut rng) + 1) as f64;
            interactions.push(Interaction::new(
                user_id,
                content_id,
                rating,
                InteractionKind::Rating,
            ));
        }

        let contents = (1..=self.n_contents as i64)
            .map(|content_id| Content {
                content_id,
                title: format!("Content {}", content_id),
            })
            .collect();

        Ok(DatasetSnapshot {
            interactions: dedup_keep_latest(interactions),
            contents,
        })
    }
}

#[async_trait]
impl InteractionStore for SimulatedDataset {
    async fn load(&self) -> AppResult<DatasetSnapshot> {
        let snapshot = self.generate()?;
        tracing::info!(
            interactions = snapshot.interactions.len(),
            contents = snapshot.contents.len(),
            seed = self.seed,
            "Generated simulated dataset"
        );
        Ok(snapshot)
    }

    async fn record(&self, _interaction: NewInteraction) -> AppResult<()> {
        Err(AppError::InvalidInput(
            "interaction recording requires a database-backed store".to_string(),
        ))
    }
}

/// Live interaction store backed by the upstream backend's Postgres schema.
///
/// The `user_interactions` and `contents` tables are owned by the backend
/// service; this store only reads them and appends interactions.
pub struct PgDataset {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    user_id: i64,
    content_id: i64,
    rating: Option<f64>,
    interaction_type: String,
}

impl InteractionRow {
    /// Explicit ratings only count for explicit-rating rows; every other
    /// kind carries its implied value.
    fn effective_rating(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::Rating => self.rating.unwrap_or_else(|| kind.implied_rating()),
            other => other.implied_rating(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    content_id: i64,
    title: String,
}

impl PgDataset {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn kind_from_tag(tag: &str) -> InteractionKind {
        match tag {
            "view" => InteractionKind::View,
            "like" => InteractionKind::Like,
            "dislike" => InteractionKind::Dislike,
            _ => InteractionKind::Rating,
        }
    }
}

#[async_trait]
impl InteractionStore for PgDataset {
    async fn load(&self) -> AppResult<DatasetSnapshot> {
        // Ascending created_at makes keep-latest dedup match wall-clock
        // recency.
        let interaction_rows: Vec<InteractionRow> = sqlx::query_as(
            r#"
            SELECT
                user_id,
                content_id,
                CAST(rating AS DOUBLE PRECISION) AS rating,
                interaction_type
            FROM user_interactions
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let content_rows: Vec<ContentRow> = sqlx::query_as(
            r#"
            SELECT id AS content_id, title
            FROM contents
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let interactions: Vec<Interaction> = interaction_rows
            .into_iter()
            .map(|row| {
                let kind = Self::kind_from_tag(&row.interaction_type);
                let rating = row.effective_rating(kind);
                Interaction::new(row.user_id, row.content_id, rating, kind)
            })
            .collect();

        let contents: Vec<Content> = content_rows
            .into_iter()
            .map(|row| Content {
                content_id: row.content_id,
                title: row.title,
            })
            .collect();

        tracing::info!(
            interactions = interactions.len(),
            contents = contents.len(),
            "Loaded dataset from database"
        );

        Ok(DatasetSnapshot {
            interactions: dedup_keep_latest(interactions),
            contents,
        })
    }

    async fn record(&self, interaction: NewInteraction) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_interactions
                (user_id, content_id, interaction_type, rating, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(interaction.user_id)
        .bind(interaction.content_id)
        .bind(tag_for_kind(interaction.interaction_type))
        .bind(interaction.rating)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id = interaction.user_id,
            content_id = interaction.content_id,
            kind = tag_for_kind(interaction.interaction_type),
            "Recorded interaction"
        );

        Ok(())
    }
}

fn tag_for_kind(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::View => "view",
        InteractionKind::Like => "like",
        InteractionKind::Dislike => "dislike",
        InteractionKind::Rating => "rating",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_simulated_dataset_is_reproducible() {
        let store = SimulatedDataset::new(20, 10);
        let first = store.load().await.unwrap();
        let second = store.load().await.unwrap();
        assert_eq!(first.interactions, second.interactions);
        assert_eq!(first.contents, second.contents);
        assert!(!first.interactions.is_empty());
    }

    #[tokio::test]
    async fn test_simulated_dataset_changes_with_seed() {
        let first = SimulatedDataset::with_seed(20, 10, 1).load().await.unwrap();
        let second = SimulatedDataset::with_seed(20, 10, 2).load().await.unwrap();
        assert_ne!(first.interactions, second.interactions);
    }

    #[tokio::test]
    async fn test_simulated_dataset_has_no_duplicate_pairs() {
        let snapshot = SimulatedDataset::new(50, 25).load().await.unwrap();
        let mut seen = HashSet::new();
        for interaction in &snapshot.interactions {
            assert!(
                seen.insert((interaction.user_id, interaction.content_id)),
                "duplicate pair ({}, {})",
                interaction.user_id,
                interaction.content_id
            );
        }
    }

    #[tokio::test]
    async fn test_simulated_dataset_bounds() {
        let snapshot = SimulatedDataset::new(30, 15).load().await.unwrap();
        for interaction in &snapshot.interactions {
            assert!((1..=30).contains(&interaction.user_id));
            assert!((1..=15).contains(&interaction.content_id));
            assert!((1.0..=5.0).contains(&interaction.rating));
        }
        assert_eq!(snapshot.contents.len(), 15);
        assert_eq!(snapshot.contents[0].title, "Content 1");
    }

    #[tokio::test]
    async fn test_simulated_store_rejects_record() {
        let store = SimulatedDataset::new(5, 5);
        let result = store
            .record(NewInteraction {
                user_id: 1,
                content_id: 1,
                interaction_type: InteractionKind::Like,
                rating: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_dedup_keeps_latest_rating() {
        let interactions = vec![
            Interaction::new(1, 10, 2.0, InteractionKind::Rating),
            Interaction::new(2, 10, 3.0, InteractionKind::Rating),
            Interaction::new(1, 10, 5.0, InteractionKind::Rating),
        ];
        let deduped = dedup_keep_latest(interactions);
        assert_eq!(deduped.len(), 2);
        let first = deduped.iter().find(|i| i.user_id == 1).unwrap();
        assert_eq!(first.rating, 5.0);
    }

    #[test]
    fn test_dedup_keeps_distinct_pairs() {
        let interactions = vec![
            Interaction::new(1, 10, 2.0, InteractionKind::Rating),
            Interaction::new(1, 20, 3.0, InteractionKind::Rating),
            Interaction::new(2, 10, 4.0, InteractionKind::Rating),
        ];
        let deduped = dedup_keep_latest(interactions.clone());
        assert_eq!(deduped, interactions);
    }
}
