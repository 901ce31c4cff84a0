use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{Interaction, Rating, Recipe},
};

#[derive(Debug, Serialize, PartialEq)]
pub struct ExportedIngredient {
    pub id: i64,
    pub name: String,
    pub common_allergens: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ExportedRecipe {
    pub id: i64,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
    pub food_flags: Vec<String>,
    pub ingredients: Vec<ExportedIngredient>,
}

impl From<&Recipe> for ExportedRecipe {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            calories: recipe.calories,
            protein: recipe.protein,
            carbs: recipe.carbs,
            fat: recipe.fat,
            fiber: recipe.fiber,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            food_flags: recipe.food_flags.clone(),
            ingredients: recipe
                .ingredients
                .iter()
                .map(|i| ExportedIngredient {
                    id: i.id,
                    name: i.name.clone(),
                    common_allergens: i.common_allergens.clone(),
                })
                .collect(),
        }
    }
}

/// One weighted (user, recipe) signal
#[derive(Debug, Serialize, PartialEq)]
pub struct ExportedInteraction {
    pub user_id: i64,
    pub recipe_id: i64,
    pub rating: f64,
}

/// Ratings first, then logged interactions at their implicit weight
pub fn training_interactions(
    ratings: &[Rating],
    interactions: &[Interaction],
) -> Vec<ExportedInteraction> {
    ratings
        .iter()
        .map(|r| ExportedInteraction {
            user_id: r.user_id,
            recipe_id: r.recipe_id,
            rating: f64::from(r.rating),
        })
        .chain(interactions.iter().map(|i| ExportedInteraction {
            user_id: i.user_id,
            recipe_id: i.recipe_id,
            rating: i.interaction_type.weight(),
        }))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub recipes_path: PathBuf,
    pub interactions_path: PathBuf,
    pub recipes: usize,
    pub interactions: usize,
}

/// Writes `recipes.json` and `interactions.json` into `output_dir`
pub async fn export_training_data(
    repo: &dyn Repository,
    output_dir: &Path,
) -> AppResult<ExportSummary> {
    let recipes: Vec<ExportedRecipe> = repo
        .all_recipes()
        .await?
        .iter()
        .map(ExportedRecipe::from)
        .collect();
    let interactions = training_interactions(
        &repo.all_ratings().await?,
        &repo.all_interactions().await?,
    );

    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        AppError::Internal(format!("Failed to create {}: {}", output_dir.display(), e))
    })?;

    let recipes_path = output_dir.join("recipes.json");
    let interactions_path = output_dir.join("interactions.json");
    write_json(&recipes_path, &recipes).await?;
    write_json(&interactions_path, &interactions).await?;

    tracing::info!(
        output_dir = %output_dir.display(),
        recipes = recipes.len(),
        interactions = interactions.len(),
        "Exported training data"
    );

    Ok(ExportSummary {
        recipes_path,
        interactions_path,
        recipes: recipes.len(),
        interactions: interactions.len(),
    })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize {}: {}", path.display(), e)))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write {}: {}", path.display(), e)))
}
