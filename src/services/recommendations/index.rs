use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

use super::{
    collaborative::{self, History, Neighbor},
    features::{self, FeatureScaler},
};
use crate::{
    error::{AppError, AppResult},
    models::{Interaction, Rating, Recipe},
};

/// Trained recommendation artifact
///
/// Holds everything ranking needs that is expensive to derive per request:
/// the catalog scaler and standardized vectors, content neighbors, user
/// weight histories with their user neighbors, and recipe popularity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationIndex {
    /// Build time in milliseconds since the epoch
    pub version: i64,
    pub built_at: DateTime<Utc>,
    pub neighbors_k: usize,
    pub scaler: FeatureScaler,
    pub features: BTreeMap<i64, Vec<f64>>,
    pub content_neighbors: BTreeMap<i64, Vec<Neighbor>>,
    pub user_weights: BTreeMap<i64, History>,
    pub user_neighbors: BTreeMap<i64, Vec<Neighbor>>,
    pub popularity: BTreeMap<i64, f64>,
    pub interaction_count: usize,
}

impl RecommendationIndex {
    pub fn build(
        recipes: &[Recipe],
        interactions: &[Interaction],
        ratings: &[Rating],
        k: usize,
    ) -> Self {
        let built_at = Utc::now();

        let raw: Vec<Vec<f64>> = recipes.iter().map(features::raw_features).collect();
        let scaler = FeatureScaler::fit(&raw);
        let vectors: BTreeMap<i64, Vec<f64>> = recipes
            .iter()
            .zip(&raw)
            .map(|(recipe, row)| (recipe.id, scaler.transform(row)))
            .collect();

        let content_neighbors = vectors
            .iter()
            .map(|(id, vector)| {
                let candidates = vectors
                    .iter()
                    .filter(|(other, _)| *other != id)
                    .map(|(other, other_vector)| Neighbor {
                        id: *other,
                        score: features::cosine(vector, other_vector),
                    })
                    .collect();
                (*id, collaborative::top_k(candidates, k))
            })
            .collect();

        let user_weights = collaborative::interaction_weights(interactions, ratings);
        let user_neighbors = collaborative::similar_users(&user_weights, k);

        let mut popularity: BTreeMap<i64, f64> = BTreeMap::new();
        for history in user_weights.values() {
            for (recipe, weight) in history {
                *popularity.entry(*recipe).or_insert(0.0) += weight;
            }
        }

        tracing::info!(
            recipes = recipes.len(),
            users = user_weights.len(),
            interactions = interactions.len() + ratings.len(),
            neighbors_k = k,
            "Built recommendation index"
        );

        Self {
            version: built_at.timestamp_millis(),
            built_at,
            neighbors_k: k,
            scaler,
            features: vectors,
            content_neighbors,
            user_weights,
            user_neighbors,
            popularity,
            interaction_count: interactions.len() + ratings.len(),
        }
    }

    /// Standardized vector, transforming recipes added after the build
    pub fn vector_for(&self, recipe: &Recipe) -> Vec<f64> {
        match self.features.get(&recipe.id) {
            Some(vector) => vector.clone(),
            None => self.scaler.transform_recipe(recipe),
        }
    }

    /// Indexed neighbors when they cover `n` results
    pub fn neighbors_of(&self, recipe_id: i64, n: usize) -> Option<&[Neighbor]> {
        if n > self.neighbors_k {
            return None;
        }
        self.content_neighbors
            .get(&recipe_id)
            .map(|neighbors| &neighbors[..n.min(neighbors.len())])
    }

    /// Popularity scaled by the catalog maximum, 0 without interactions
    pub fn normalized_popularity(&self, recipe_id: i64) -> f64 {
        let max = self.popularity.values().copied().fold(0.0, f64::max);
        if max <= 0.0 {
            return 0.0;
        }
        self.popularity.get(&recipe_id).copied().unwrap_or(0.0) / max
    }

    pub fn user_count(&self) -> usize {
        self.user_weights.len()
    }

    /// Writes the index as JSON, replacing any previous file atomically
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_vec(self)
            .map_err(|e| AppError::Internal(format!("Failed to serialize index: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to replace {}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), version = self.version, "Saved recommendation index");
        Ok(())
    }

    /// Reads a saved index, `None` when the file does not exist
    pub async fn load(path: &Path) -> AppResult<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let index = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Internal(format!("Corrupt index at {}: {}", path.display(), e))
        })?;
        Ok(Some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{recipe::fixtures::recipe, InteractionKind};

    fn catalog() -> Vec<Recipe> {
        let mut light = recipe(1, "Light Salad");
        light.calories = 150;
        light.fat = 3.0;

        let mut also_light = recipe(2, "Green Soup");
        also_light.calories = 180;
        also_light.fat = 4.0;

        let mut heavy = recipe(3, "Lasagna");
        heavy.calories = 900;
        heavy.fat = 45.0;
        heavy.cook_time = 90;

        vec![light, also_light, heavy]
    }

    fn interaction(user_id: i64, recipe_id: i64, kind: InteractionKind) -> Interaction {
        Interaction {
            id: 0,
            user_id,
            recipe_id,
            interaction_type: kind,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_content_neighbors_exclude_self_and_rank() {
        let index = RecommendationIndex::build(&catalog(), &[], &[], 20);

        let neighbors = &index.content_neighbors[&1];
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.iter().all(|n| n.id != 1));
        assert_eq!(neighbors[0].id, 2);
    }

    #[test]
    fn test_neighbors_of_respects_k() {
        let index = RecommendationIndex::build(&catalog(), &[], &[], 1);
        assert_eq!(index.neighbors_of(1, 1).map(|n| n.len()), Some(1));
        assert!(index.neighbors_of(1, 2).is_none());
        assert!(index.neighbors_of(42, 1).is_none());
    }

    #[test]
    fn test_popularity() {
        let interactions = vec![
            interaction(1, 1, InteractionKind::Cook),
            interaction(2, 1, InteractionKind::Save),
            interaction(2, 2, InteractionKind::View),
        ];
        let index = RecommendationIndex::build(&catalog(), &interactions, &[], 20);

        assert_eq!(index.normalized_popularity(1), 1.0);
        assert!((index.normalized_popularity(2) - 0.1).abs() < 1e-9);
        assert_eq!(index.normalized_popularity(3), 0.0);
        assert_eq!(index.user_count(), 2);
        assert_eq!(index.interaction_count, 3);
    }

    #[test]
    fn test_unindexed_recipe_uses_scaler() {
        let index = RecommendationIndex::build(&catalog(), &[], &[], 20);
        let fresh = recipe(99, "New");
        assert_eq!(index.vector_for(&fresh), index.scaler.transform_recipe(&fresh));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("index.json");

        assert!(RecommendationIndex::load(&path).await.unwrap().is_none());

        let index = RecommendationIndex::build(
            &catalog(),
            &[interaction(1, 2, InteractionKind::Save)],
            &[],
            20,
        );
        index.save(&path).await.unwrap();

        let loaded = RecommendationIndex::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.version, index.version);
        let ids = |i: &RecommendationIndex| -> Vec<i64> {
            i.content_neighbors[&1].iter().map(|n| n.id).collect()
        };
        assert_eq!(ids(&loaded), ids(&index));
        assert_eq!(loaded.user_weights, index.user_weights);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(RecommendationIndex::load(&path).await.is_err());
    }
}
