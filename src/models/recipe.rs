use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{user_preferences::normalize_list, FoodFlag, Ingredient, NutritionFacts};
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Catalog recipe with its ingredients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructions: String,
    /// minutes
    pub prep_time: i32,
    /// minutes
    pub cook_time: i32,
    pub servings: i32,
    pub calories: i32,
    pub image_url: Option<String>,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sodium: f64,
    pub sugar: f64,
    pub cuisine: Option<String>,
    pub tags: Vec<String>,
    pub food_flags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn nutrition(&self) -> NutritionFacts {
        NutritionFacts {
            calories: f64::from(self.calories),
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            fiber: self.fiber,
            sodium: self.sodium,
            sugar: self.sugar,
        }
    }

    /// Flags recomputed from current nutrition values
    pub fn computed_flags(&self) -> Vec<String> {
        FoodFlag::compute_names(&self.nutrition())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Recipe creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub prep_time: i32,
    #[serde(default)]
    pub cook_time: i32,
    #[serde(default = "default_servings")]
    pub servings: i32,
    pub calories: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sodium: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ingredient IDs
    #[serde(default)]
    pub ingredients: Vec<i64>,
}

fn default_servings() -> i32 {
    1
}

impl NewRecipe {
    /// Validates field ranges and normalizes free-text lists
    pub fn normalized(mut self) -> AppResult<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::Validation("Recipe title cannot be empty".to_string()));
        }
        if self.servings < 1 {
            return Err(AppError::Validation("Servings must be at least 1".to_string()));
        }
        if self.prep_time < 0 || self.cook_time < 0 {
            return Err(AppError::Validation("Times cannot be negative".to_string()));
        }

        let nutrition = [
            f64::from(self.calories),
            self.protein,
            self.carbs,
            self.fat,
            self.fiber,
            self.sodium,
            self.sugar,
        ];
        if nutrition.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(AppError::Validation(
                "Nutrition values must be non-negative numbers".to_string(),
            ));
        }

        self.cuisine = self
            .cuisine
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());
        self.tags = normalize_list(self.tags);
        self.ingredients.sort_unstable();
        self.ingredients.dedup();
        Ok(self)
    }

    pub fn nutrition(&self) -> NutritionFacts {
        NutritionFacts {
            calories: f64::from(self.calories),
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            fiber: self.fiber,
            sodium: self.sodium,
            sugar: self.sugar,
        }
    }
}

/// Catalog listing parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub cuisine: Option<String>,
}

impl RecipeQuery {
    pub fn offset(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn cuisine_filter(&self) -> Option<String> {
        self.cuisine
            .as_ref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn new_recipe() -> NewRecipe {
        serde_json::from_str(
            r#"{
                "title": " Italian Pasta ",
                "calories": 600,
                "protein": 20,
                "carbs": 80,
                "fat": 15,
                "sodium": 700,
                "cuisine": "Italian",
                "tags": ["Vegetarian", "vegetarian"],
                "ingredients": [3, 1, 3]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_normalized_recipe() {
        let recipe = new_recipe().normalized().unwrap();
        assert_eq!(recipe.title, "Italian Pasta");
        assert_eq!(recipe.servings, 1);
        assert_eq!(recipe.cuisine.as_deref(), Some("italian"));
        assert_eq!(recipe.tags, vec!["vegetarian"]);
        assert_eq!(recipe.ingredients, vec![1, 3]);
    }

    #[test]
    fn test_negative_nutrition_rejected() {
        let mut recipe = new_recipe();
        recipe.fat = -1.0;
        assert!(matches!(recipe.normalized(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_zero_servings_rejected() {
        let mut recipe = new_recipe();
        recipe.servings = 0;
        assert!(recipe.normalized().is_err());
    }

    #[test]
    fn test_flags_from_nutrition() {
        let recipe = new_recipe();
        assert_eq!(
            FoodFlag::compute_names(&recipe.nutrition()),
            vec!["high_sodium", "high_calories", "high_carbs"]
        );
    }

    #[test]
    fn test_query_bounds() {
        let query = RecipeQuery {
            skip: Some(-5),
            limit: Some(1000),
            cuisine: Some(" Thai ".to_string()),
        };
        assert_eq!(query.offset(), 0);
        assert_eq!(query.page_size(), MAX_PAGE_SIZE);
        assert_eq!(query.cuisine_filter().as_deref(), Some("thai"));
        assert_eq!(RecipeQuery::default().page_size(), DEFAULT_PAGE_SIZE);
    }
}
