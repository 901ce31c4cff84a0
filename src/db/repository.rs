use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        Ingredient, Interaction, InteractionKind, NewIngredient, NewRecipe, NewUser, Rating,
        RatingRequest, Recipe, RecipeQuery, User,
    },
};

/// Storage abstraction over the catalog, accounts and interaction log
///
/// Implementations must enforce: unique user emails and ingredient names
/// (case-insensitive, reported as `AppError::Conflict`), at most one `save`
/// interaction and one rating per (user, recipe), and `NotFound` for writes
/// that reference a missing recipe.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    /// Email lookup is case-insensitive
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Persists every mutable field of `user` and returns the stored row
    async fn update_user(&self, user: &User) -> AppResult<User>;

    async fn create_ingredient(&self, ingredient: NewIngredient) -> AppResult<Ingredient>;

    /// Inserts ingredients whose name is not yet present, returning the count inserted
    async fn insert_missing_ingredients(&self, ingredients: &[NewIngredient]) -> AppResult<usize>;

    /// Case-insensitive substring match on ingredient names, ordered by name
    async fn search_ingredients(&self, query: &str, limit: i64) -> AppResult<Vec<Ingredient>>;

    /// Stores a recipe, deriving its food flags; unknown ingredient IDs are invalid input
    async fn create_recipe(&self, recipe: NewRecipe) -> AppResult<Recipe>;

    async fn get_recipe(&self, id: i64) -> AppResult<Option<Recipe>>;

    /// Recipes for the given IDs in the same order, skipping missing ones
    async fn get_recipes(&self, ids: &[i64]) -> AppResult<Vec<Recipe>>;

    async fn list_recipes(&self, query: &RecipeQuery) -> AppResult<Vec<Recipe>>;

    async fn all_recipes(&self) -> AppResult<Vec<Recipe>>;

    /// Logs an interaction; repeated saves return the existing one
    async fn add_interaction(
        &self,
        user_id: i64,
        recipe_id: i64,
        kind: InteractionKind,
    ) -> AppResult<Interaction>;

    /// Removes matching interactions, returning whether any existed
    async fn remove_interaction(
        &self,
        user_id: i64,
        recipe_id: i64,
        kind: InteractionKind,
    ) -> AppResult<bool>;

    async fn user_interactions(&self, user_id: i64) -> AppResult<Vec<Interaction>>;

    async fn all_interactions(&self) -> AppResult<Vec<Interaction>>;

    /// Recipes the user saved, oldest save first
    async fn favorite_recipes(&self, user_id: i64) -> AppResult<Vec<Recipe>>;

    /// Creates or replaces the user's rating for a recipe
    async fn upsert_rating(
        &self,
        user_id: i64,
        recipe_id: i64,
        rating: &RatingRequest,
    ) -> AppResult<Rating>;

    async fn user_ratings(&self, user_id: i64) -> AppResult<Vec<Rating>>;

    async fn all_ratings(&self) -> AppResult<Vec<Rating>>;
}
