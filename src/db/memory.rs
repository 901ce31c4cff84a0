use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        FoodFlag, Ingredient, Interaction, InteractionKind, NewIngredient, NewRecipe, NewUser,
        Rating, RatingRequest, Recipe, RecipeQuery, User,
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    interactions: Vec<Interaction>,
    ratings: Vec<Rating>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn recipe_exists(&self, id: i64) -> AppResult<()> {
        if self.recipes.iter().any(|r| r.id == id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Recipe {} not found", id)))
        }
    }

    fn ingredient_named(&self, name: &str) -> bool {
        self.ingredients
            .iter()
            .any(|i| i.name.eq_ignore_ascii_case(name))
    }

    fn insert_ingredient(&mut self, ingredient: &NewIngredient) -> Ingredient {
        let stored = Ingredient {
            id: self.next_id(),
            name: ingredient.name.clone(),
            category: ingredient.category.clone(),
            common_allergens: ingredient.common_allergens.clone(),
            source: ingredient.source.clone(),
        };
        self.ingredients.push(stored.clone());
        stored
    }
}

/// Process-local repository used by tests and `--in-memory` runs
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let stored = User {
            id: tables.next_id(),
            email: user.email,
            hashed_password: user.hashed_password,
            is_active: true,
            is_admin: user.is_admin,
            created_at: Utc::now(),
            dietary_restrictions: user.preferences.dietary_restrictions,
            favorite_cuisines: user.preferences.favorite_cuisines,
            allergies: user.preferences.allergies,
            food_flags: user.preferences.food_flags,
        };
        tables.users.push(stored.clone());
        Ok(stored)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let stored = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;
        *stored = User {
            created_at: stored.created_at,
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> AppResult<Ingredient> {
        let mut tables = self.tables.write().await;
        if tables.ingredient_named(&ingredient.name) {
            return Err(AppError::Conflict(format!(
                "Ingredient '{}' already exists",
                ingredient.name
            )));
        }
        Ok(tables.insert_ingredient(&ingredient))
    }

    async fn insert_missing_ingredients(&self, ingredients: &[NewIngredient]) -> AppResult<usize> {
        let mut tables = self.tables.write().await;
        let mut inserted = 0;
        for ingredient in ingredients {
            if !tables.ingredient_named(&ingredient.name) {
                tables.insert_ingredient(ingredient);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn search_ingredients(&self, query: &str, limit: i64) -> AppResult<Vec<Ingredient>> {
        let tables = self.tables.read().await;
        let needle = query.to_lowercase();
        let mut found: Vec<Ingredient> = tables
            .ingredients
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn create_recipe(&self, recipe: NewRecipe) -> AppResult<Recipe> {
        let mut tables = self.tables.write().await;

        let mut ingredients = Vec::with_capacity(recipe.ingredients.len());
        for id in &recipe.ingredients {
            let ingredient = tables
                .ingredients
                .iter()
                .find(|i| i.id == *id)
                .cloned()
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown ingredient id {}", id)))?;
            ingredients.push(ingredient);
        }

        let food_flags = FoodFlag::compute_names(&recipe.nutrition());
        let stored = Recipe {
            id: tables.next_id(),
            title: recipe.title,
            description: recipe.description,
            instructions: recipe.instructions,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            calories: recipe.calories,
            image_url: recipe.image_url,
            protein: recipe.protein,
            carbs: recipe.carbs,
            fat: recipe.fat,
            fiber: recipe.fiber,
            sodium: recipe.sodium,
            sugar: recipe.sugar,
            cuisine: recipe.cuisine,
            tags: recipe.tags,
            food_flags,
            created_at: Utc::now(),
            ingredients,
        };
        tables.recipes.push(stored.clone());
        Ok(stored)
    }

    async fn get_recipe(&self, id: i64) -> AppResult<Option<Recipe>> {
        let tables = self.tables.read().await;
        Ok(tables.recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn get_recipes(&self, ids: &[i64]) -> AppResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.recipes.iter().find(|r| r.id == *id).cloned())
            .collect())
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> AppResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        let cuisine = query.cuisine_filter();
        Ok(tables
            .recipes
            .iter()
            .filter(|r| cuisine.is_none() || r.cuisine == cuisine)
            .skip(query.offset() as usize)
            .take(query.page_size() as usize)
            .cloned()
            .collect())
    }

    async fn all_recipes(&self) -> AppResult<Vec<Recipe>> {
        Ok(self.tables.read().await.recipes.clone())
    }

    async fn add_interaction(
        &self,
        user_id: i64,
        recipe_id: i64,
        kind: InteractionKind,
    ) -> AppResult<Interaction> {
        let mut tables = self.tables.write().await;
        tables.recipe_exists(recipe_id)?;

        if kind == InteractionKind::Save {
            if let Some(existing) = tables.interactions.iter().find(|i| {
                i.user_id == user_id && i.recipe_id == recipe_id && i.interaction_type == kind
            }) {
                return Ok(existing.clone());
            }
        }

        let interaction = Interaction {
            id: tables.next_id(),
            user_id,
            recipe_id,
            interaction_type: kind,
            timestamp: Utc::now(),
        };
        tables.interactions.push(interaction.clone());
        Ok(interaction)
    }

    async fn remove_interaction(
        &self,
        user_id: i64,
        recipe_id: i64,
        kind: InteractionKind,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.interactions.len();
        tables.interactions.retain(|i| {
            !(i.user_id == user_id && i.recipe_id == recipe_id && i.interaction_type == kind)
        });
        Ok(tables.interactions.len() != before)
    }

    async fn user_interactions(&self, user_id: i64) -> AppResult<Vec<Interaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_interactions(&self) -> AppResult<Vec<Interaction>> {
        Ok(self.tables.read().await.interactions.clone())
    }

    async fn favorite_recipes(&self, user_id: i64) -> AppResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        Ok(tables
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id && i.interaction_type == InteractionKind::Save)
            .filter_map(|i| tables.recipes.iter().find(|r| r.id == i.recipe_id).cloned())
            .collect())
    }

    async fn upsert_rating(
        &self,
        user_id: i64,
        recipe_id: i64,
        rating: &RatingRequest,
    ) -> AppResult<Rating> {
        let mut tables = self.tables.write().await;
        tables.recipe_exists(recipe_id)?;

        if let Some(existing) = tables
            .ratings
            .iter_mut()
            .find(|r| r.user_id == user_id && r.recipe_id == recipe_id)
        {
            existing.rating = rating.rating;
            existing.comment = rating.comment.clone();
            existing.created_at = Utc::now();
            return Ok(existing.clone());
        }

        let stored = Rating {
            id: tables.next_id(),
            user_id,
            recipe_id,
            rating: rating.rating,
            comment: rating.comment.clone(),
            created_at: Utc::now(),
        };
        tables.ratings.push(stored.clone());
        Ok(stored)
    }

    async fn user_ratings(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_ratings(&self) -> AppResult<Vec<Rating>> {
        Ok(self.tables.read().await.ratings.clone())
    }
}
