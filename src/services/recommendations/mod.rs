pub mod collaborative;
pub mod features;
pub mod filters;
pub mod index;

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::sync::{Mutex, RwLock};

use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey, Repository},
    error::{AppError, AppResult},
    models::{InteractionKind, Recipe, RecipeRecommendation, TrainingSummary, User},
};
pub use index::RecommendationIndex;

/// Tunables for ranking and index maintenance
#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    pub neighbors: usize,
    pub cf_weight: f64,
    pub content_weight: f64,
    pub model_path: PathBuf,
    pub similar_cache_ttl_secs: u64,
}

impl From<&Config> for RecommenderSettings {
    fn from(config: &Config) -> Self {
        Self {
            neighbors: config.recommendation_neighbors,
            cf_weight: config.cf_weight,
            content_weight: config.content_weight,
            model_path: PathBuf::from(&config.model_path),
            similar_cache_ttl_secs: config.similar_cache_ttl_secs,
        }
    }
}

/// Hybrid recipe recommender
///
/// Ranks with collaborative and content signals read from a shared
/// [`RecommendationIndex`]. The index is swapped whole on every rebuild, so
/// in-flight requests keep the snapshot they started with.
pub struct RecommendationService {
    repo: Arc<dyn Repository>,
    cache: Option<Cache>,
    settings: RecommenderSettings,
    index: RwLock<Option<Arc<RecommendationIndex>>>,
    rebuild_lock: Mutex<()>,
}

impl RecommendationService {
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: Option<Cache>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            repo,
            cache,
            settings,
            index: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub async fn current_index(&self) -> Option<Arc<RecommendationIndex>> {
        self.index.read().await.clone()
    }

    /// Loads the persisted index if one exists, returning whether it did
    pub async fn load_persisted(&self) -> AppResult<bool> {
        match RecommendationIndex::load(&self.settings.model_path).await? {
            Some(index) => {
                tracing::info!(
                    path = %self.settings.model_path.display(),
                    version = index.version,
                    recipes = index.features.len(),
                    "Loaded recommendation index"
                );
                *self.index.write().await = Some(Arc::new(index));
                Ok(true)
            }
            None => {
                tracing::info!(
                    path = %self.settings.model_path.display(),
                    "No saved recommendation index, it will be built on first use"
                );
                Ok(false)
            }
        }
    }

    /// Returns the current index, building one if none exists yet
    pub async fn ensure_index(&self) -> AppResult<Arc<RecommendationIndex>> {
        if let Some(index) = self.current_index().await {
            return Ok(index);
        }

        let _guard = self.rebuild_lock.lock().await;
        // another request may have finished a build while we waited
        if let Some(index) = self.current_index().await {
            return Ok(index);
        }

        let index = self.build_and_swap().await?;
        if let Err(e) = index.save(&self.settings.model_path).await {
            tracing::error!(error = %e, "Failed to persist lazily built index");
        }
        Ok(index)
    }

    /// Rebuilds the index from storage, swaps it in and persists it
    pub async fn train(&self) -> AppResult<TrainingSummary> {
        let _guard = self.rebuild_lock.lock().await;
        let index = self.build_and_swap().await?;
        index.save(&self.settings.model_path).await?;

        Ok(TrainingSummary {
            message: "Model trained successfully".to_string(),
            version: index.version,
            built_at: index.built_at,
            recipes: index.features.len(),
            users: index.user_count(),
            interactions: index.interaction_count,
        })
    }

    async fn build_and_swap(&self) -> AppResult<Arc<RecommendationIndex>> {
        let recipes = self.repo.all_recipes().await?;
        let interactions = self.repo.all_interactions().await?;
        let ratings = self.repo.all_ratings().await?;

        let k = self.settings.neighbors;
        let mut index = tokio::task::spawn_blocking(move || {
            RecommendationIndex::build(&recipes, &interactions, &ratings, k)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Index build task failed: {}", e)))?;

        let mut slot = self.index.write().await;
        // versions key cached results, so they must grow even within one millisecond
        if let Some(previous) = slot.as_ref() {
            index.version = index.version.max(previous.version + 1);
        }
        let index = Arc::new(index);
        *slot = Some(index.clone());
        Ok(index)
    }

    /// Periodically rebuilds the index until the runtime shuts down
    pub fn spawn_retrain_loop(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.train().await {
                    Ok(summary) => tracing::info!(
                        version = summary.version,
                        recipes = summary.recipes,
                        users = summary.users,
                        "Scheduled index rebuild finished"
                    ),
                    Err(e) => tracing::error!(error = %e, "Scheduled index rebuild failed"),
                }
            }
        })
    }

    /// Recipes closest to `recipe_id` by standardized nutrition and timing
    pub async fn similar_recipes(
        &self,
        recipe_id: i64,
        n: usize,
    ) -> AppResult<Vec<RecipeRecommendation>> {
        let target = self
            .repo
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", recipe_id)))?;
        let index = self.ensure_index().await?;

        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::SimilarRecipes {
                    recipe_id,
                    limit: n,
                    index_version: index.version,
                },
                self.settings.similar_cache_ttl_secs,
                self.compute_similar(&index, &target, n)
            ),
            None => self.compute_similar(&index, &target, n).await,
        }
    }

    async fn compute_similar(
        &self,
        index: &RecommendationIndex,
        target: &Recipe,
        n: usize,
    ) -> AppResult<Vec<RecipeRecommendation>> {
        if let Some(neighbors) = index.neighbors_of(target.id, n) {
            let ids: Vec<i64> = neighbors.iter().map(|nb| nb.id).collect();
            let scores: HashMap<i64, f64> = neighbors.iter().map(|nb| (nb.id, nb.score)).collect();
            let recipes = self.repo.get_recipes(&ids).await?;

            return Ok(recipes
                .iter()
                .map(|recipe| {
                    let score = scores.get(&recipe.id).copied().unwrap_or(0.0);
                    RecipeRecommendation::from_recipe(recipe, score)
                })
                .collect());
        }

        tracing::debug!(recipe_id = target.id, n, "Scanning catalog for similar recipes");
        let target_vector = index.vector_for(target);
        let candidates = self
            .repo
            .all_recipes()
            .await?
            .iter()
            .filter(|recipe| recipe.id != target.id)
            .map(|recipe| {
                let score = features::cosine(&target_vector, &index.vector_for(recipe));
                RecipeRecommendation::from_recipe(recipe, score)
            })
            .collect();

        Ok(filters::rank(candidates, n))
    }

    /// Hybrid personalized ranking for `user`
    ///
    /// Users without history fall back to catalog popularity. Recipes the
    /// user already saved or cooked are never recommended.
    pub async fn get_recommendations(
        &self,
        user: &User,
        n: usize,
    ) -> AppResult<Vec<RecipeRecommendation>> {
        let index = self.ensure_index().await?;
        let prefs = user.preferences();

        let interactions = self.repo.user_interactions(user.id).await?;
        let ratings = self.repo.user_ratings(user.id).await?;
        let history = collaborative::interaction_weights(&interactions, &ratings)
            .remove(&user.id)
            .unwrap_or_default();

        let consumed: HashSet<i64> = interactions
            .iter()
            .filter(|i| matches!(i.interaction_type, InteractionKind::Save | InteractionKind::Cook))
            .map(|i| i.recipe_id)
            .collect();

        let recipes = self.repo.all_recipes().await?;

        let scored: Vec<(Recipe, f64)> = if history.is_empty() {
            tracing::debug!(user_id = user.id, "No history, ranking by popularity");
            recipes
                .into_iter()
                .filter(|recipe| !consumed.contains(&recipe.id))
                .map(|recipe| {
                    let score = index.normalized_popularity(recipe.id);
                    (recipe, score)
                })
                .collect()
        } else {
            let cf = index
                .user_neighbors
                .get(&user.id)
                .map(|neighbors| {
                    collaborative::collaborative_scores(&history, neighbors, &index.user_weights)
                })
                .unwrap_or_default();

            let by_id: HashMap<i64, &Recipe> = recipes.iter().map(|r| (r.id, r)).collect();
            let profile = content_profile(&index, &history, &by_id);

            recipes
                .iter()
                .filter(|recipe| !consumed.contains(&recipe.id))
                .map(|recipe| {
                    let content = profile
                        .as_ref()
                        .map(|p| (features::cosine(p, &index.vector_for(recipe)) + 1.0) / 2.0)
                        .unwrap_or(0.0);
                    let collaborative = cf.get(&recipe.id).copied().unwrap_or(0.0);
                    let score = self.settings.cf_weight * collaborative
                        + self.settings.content_weight * content;
                    (recipe.clone(), score)
                })
                .collect()
        };

        let recommendations = filters::filter_by_preferences(scored, &prefs);
        tracing::debug!(
            user_id = user.id,
            candidates = recommendations.len(),
            "Ranked personalized candidates"
        );
        Ok(filters::rank(recommendations, n))
    }
}

/// Weighted mean of the standardized vectors in a user's history
fn content_profile(
    index: &RecommendationIndex,
    history: &collaborative::History,
    recipes: &HashMap<i64, &Recipe>,
) -> Option<Vec<f64>> {
    let mut profile = vec![0.0; features::FEATURE_NAMES.len()];
    let mut total = 0.0;

    for (recipe_id, weight) in history {
        let Some(recipe) = recipes.get(recipe_id) else {
            continue;
        };
        for (p, v) in profile.iter_mut().zip(index.vector_for(recipe)) {
            *p += weight * v;
        }
        total += weight;
    }

    if total <= 0.0 {
        return None;
    }
    profile.iter_mut().for_each(|p| *p /= total);
    Some(profile)
}
