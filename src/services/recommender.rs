use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::{Interaction, NewInteraction, Recommendation, Strategy};
use crate::services::dataset::{dedup_keep_latest, DatasetSnapshot, InteractionStore};
use crate::services::matrix::InteractionMatrix;
use crate::services::similarity::user_similarities;

/// Number of most-similar users consulted by the collaborative-filtering
/// path. Independent of the requested top_n; a tunable, not a formula.
pub const NEIGHBORHOOD_SIZE: usize = 10;

/// Dataset counts exposed for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub total_users: usize,
    pub total_contents: usize,
    pub total_interactions: usize,
    pub avg_interactions_per_user: f64,
    pub loaded_at: DateTime<Utc>,
}

/// One immutable model generation: the deduplicated working set, the title
/// map, the dense matrix, and a per-user interaction index.
///
/// Never mutated after build; reload replaces the whole generation.
pub struct ModelState {
    interactions: Vec<Interaction>,
    titles: HashMap<i64, String>,
    matrix: InteractionMatrix,
    by_user: HashMap<i64, Vec<(i64, f64)>>,
    loaded_at: DateTime<Utc>,
}

impl ModelState {
    /// Builds a generation from a source snapshot. Deduplication is applied
    /// here regardless of source, so the working-set invariant (at most one
    /// interaction per user/content pair) holds for every store.
    pub fn build(snapshot: DatasetSnapshot) -> Self {
        let interactions = dedup_keep_latest(snapshot.interactions);
        let matrix = InteractionMatrix::from_interactions(&interactions);

        let titles = snapshot
            .contents
            .into_iter()
            .map(|content| (content.content_id, content.title))
            .collect();

        let mut by_user: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
        for interaction in &interactions {
            by_user
                .entry(interaction.user_id)
                .or_default()
                .push((interaction.content_id, interaction.rating));
        }

        Self {
            interactions,
            titles,
            matrix,
            by_user,
            loaded_at: Utc::now(),
        }
    }

    pub fn recommend(&self, user_id: i64, top_n: usize, strategy: Strategy) -> Vec<Recommendation> {
        match strategy {
            Strategy::Similarity => self.recommend_by_similarity(user_id, top_n),
            Strategy::Popularity => self.recommend_by_popularity(user_id, top_n),
        }
    }

    /// Collaborative filtering: contents liked by the target's nearest
    /// neighbors, weighted by neighbor similarity, already-seen content
    /// excluded. An unknown user gets an empty result.
    pub fn recommend_by_similarity(&self, user_id: i64, top_n: usize) -> Vec<Recommendation> {
        if !self.matrix.contains_user(user_id) {
            return Vec::new();
        }

        let similarities = user_similarities(&self.matrix, user_id);
        let seen = self.seen_contents(user_id);

        // Each neighbor contributes similarity × rating to every unseen
        // content it interacted with; contributions add up across neighbors.
        let mut scores: HashMap<i64, f64> = HashMap::new();
        for (neighbor_id, similarity) in similarities.iter().take(NEIGHBORHOOD_SIZE) {
            let Some(neighbor_interactions) = self.by_user.get(neighbor_id) else {
                continue;
            };
            for (content_id, rating) in neighbor_interactions {
                if seen.contains(content_id) {
                    continue;
                }
                *scores.entry(*content_id).or_insert(0.0) += similarity * rating;
            }
        }

        let max_score = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut ranked: Vec<(i64, f64)> = scores.into_iter().collect();
        if max_score > 0.0 {
            for (_, score) in &mut ranked {
                *score /= max_score;
            }
        }

        sort_ranked(&mut ranked);
        ranked.truncate(top_n);
        self.attach_titles(ranked)
    }

    /// Global popularity: average rating dampened by the log of the
    /// interaction count, seen content excluded. An unknown user simply
    /// gets the unfiltered ranking.
    pub fn recommend_by_popularity(&self, user_id: i64, top_n: usize) -> Vec<Recommendation> {
        let mut per_content: HashMap<i64, (f64, usize)> = HashMap::new();
        for interaction in &self.interactions {
            let entry = per_content.entry(interaction.content_id).or_insert((0.0, 0));
            entry.0 += interaction.rating;
            entry.1 += 1;
        }

        let seen = self.seen_contents(user_id);

        // The log term keeps high-volume content from dominating outright;
        // dividing by 5 keeps the scale comparable to a 1–5 rating range.
        let mut ranked: Vec<(i64, f64)> = per_content
            .into_iter()
            .filter(|(content_id, _)| !seen.contains(content_id))
            .map(|(content_id, (sum, count))| {
                let avg_rating = sum / count as f64;
                (content_id, avg_rating * (count as f64).ln_1p() / 5.0)
            })
            .collect();

        sort_ranked(&mut ranked);
        ranked.truncate(top_n);

        // Normalization is applied post-selection, over the surviving top_n.
        let max_score = ranked.iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
        if max_score > 0.0 {
            for (_, score) in &mut ranked {
                *score /= max_score;
            }
        }

        self.attach_titles(ranked)
    }

    pub fn stats(&self) -> DatasetStats {
        let total_users = self.by_user.len();
        let total_interactions = self.interactions.len();
        DatasetStats {
            total_users,
            total_contents: self.titles.len(),
            total_interactions,
            avg_interactions_per_user: if total_users == 0 {
                0.0
            } else {
                total_interactions as f64 / total_users as f64
            },
            loaded_at: self.loaded_at,
        }
    }

    fn seen_contents(&self, user_id: i64) -> HashSet<i64> {
        self.by_user
            .get(&user_id)
            .map(|interactions| interactions.iter().map(|(content_id, _)| *content_id).collect())
            .unwrap_or_default()
    }

    fn attach_titles(&self, ranked: Vec<(i64, f64)>) -> Vec<Recommendation> {
        ranked
            .into_iter()
            .map(|(content_id, score)| Recommendation {
                content_id,
                score,
                title: self.titles.get(&content_id).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

/// Score descending, then content id ascending. The secondary key makes the
/// ordering deterministic across runs.
fn sort_ranked(ranked: &mut [(i64, f64)]) {
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
}

/// Owns the current model generation and the store that feeds it.
///
/// Reads clone the generation Arc under a read lock and compute against it
/// without further synchronization. Reload builds the next generation off to
/// the side and publishes it with a single pointer swap, so in-flight
/// requests observe either the old or the new generation, never a partial
/// rebuild. A failed reload leaves the previous generation published.
pub struct Recommender {
    store: Arc<dyn InteractionStore>,
    state: RwLock<Arc<ModelState>>,
}

impl Recommender {
    pub async fn new(store: Arc<dyn InteractionStore>) -> AppResult<Self> {
        let snapshot = store.load().await?;
        let state = Arc::new(ModelState::build(snapshot));
        let stats = state.stats();
        tracing::info!(
            users = stats.total_users,
            contents = stats.total_contents,
            interactions = stats.total_interactions,
            "Recommendation model loaded"
        );
        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    /// Rebuilds the model from a fresh store snapshot and swaps it in.
    pub async fn reload(&self) -> AppResult<()> {
        let snapshot = self.store.load().await?;
        let next = Arc::new(ModelState::build(snapshot));
        let stats = next.stats();

        *self.state.write().await = next;

        tracing::info!(
            users = stats.total_users,
            contents = stats.total_contents,
            interactions = stats.total_interactions,
            "Recommendation model reloaded"
        );
        Ok(())
    }

    pub async fn recommend(
        &self,
        user_id: i64,
        top_n: usize,
        strategy: Strategy,
    ) -> Vec<Recommendation> {
        self.current().await.recommend(user_id, top_n, strategy)
    }

    pub async fn stats(&self) -> DatasetStats {
        self.current().await.stats()
    }

    pub async fn record_interaction(&self, interaction: NewInteraction) -> AppResult<()> {
        self.store.record(interaction).await
    }

    async fn current(&self) -> Arc<ModelState> {
        self.state.read().await.clone()
    }
}
