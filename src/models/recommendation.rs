use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Recipe;
use crate::error::{AppError, AppResult};

pub const MAX_RECOMMENDATIONS: usize = 100;

/// Ranked recipe returned by the recommendation endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeRecommendation {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub match_score: f64,
    pub nutritional_info: NutritionalInfo,
    pub food_flags: Vec<String>,
    pub cuisine: Option<String>,
}

impl RecipeRecommendation {
    pub fn from_recipe(recipe: &Recipe, match_score: f64) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            image_url: recipe.image_url.clone(),
            match_score,
            nutritional_info: NutritionalInfo::from(recipe),
            food_flags: recipe.computed_flags(),
            cuisine: recipe.cuisine.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionalInfo {
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sodium: f64,
    pub sugar: f64,
}

impl From<&Recipe> for NutritionalInfo {
    fn from(recipe: &Recipe) -> Self {
        Self {
            calories: recipe.calories,
            protein: recipe.protein,
            carbs: recipe.carbs,
            fat: recipe.fat,
            fiber: recipe.fiber,
            sodium: recipe.sodium,
            sugar: recipe.sugar,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub n_recommendations: Option<usize>,
}

impl RecommendationQuery {
    /// Requested count, falling back to `default`, bounded to 1..=100
    pub fn count(&self, default: usize) -> AppResult<usize> {
        let n = self.n_recommendations.unwrap_or(default);
        if n == 0 || n > MAX_RECOMMENDATIONS {
            return Err(AppError::InvalidInput(format!(
                "n_recommendations must be between 1 and {}",
                MAX_RECOMMENDATIONS
            )));
        }
        Ok(n)
    }
}

/// Outcome of rebuilding the recommendation index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingSummary {
    pub message: String,
    pub version: i64,
    pub built_at: DateTime<Utc>,
    pub recipes: usize,
    pub users: usize,
    pub interactions: usize,
}
