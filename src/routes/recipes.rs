use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Interaction, InteractionRequest, NewRecipe, Rating, RatingRequest, Recipe, RecipeQuery},
    routes::{extract::{JsonBody, PathParam, QueryParams}, AppState},
};

pub async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<RecipeQuery>,
) -> AppResult<Json<Vec<Recipe>>> {
    let recipes = state.repo.list_recipes(&query).await?;
    Ok(Json(recipes))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user): CurrentUser,
    JsonBody(recipe): JsonBody<NewRecipe>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let recipe = state.repo.create_recipe(recipe.normalized()?).await?;

    tracing::info!(
        request_id = %request_id,
        user_id = user.id,
        recipe_id = recipe.id,
        food_flags = ?recipe.food_flags,
        "Created recipe"
    );

    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<Recipe>> {
    state
        .repo
        .get_recipe(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

/// Creates or replaces the caller's rating
pub async fn rate(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<i64>,
    JsonBody(rating): JsonBody<RatingRequest>,
) -> AppResult<Json<Rating>> {
    rating.validate()?;
    let stored = state.repo.upsert_rating(user.id, id, &rating).await?;
    Ok(Json(stored))
}

pub async fn log_interaction(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<i64>,
    JsonBody(request): JsonBody<InteractionRequest>,
) -> AppResult<(StatusCode, Json<Interaction>)> {
    let interaction = state
        .repo
        .add_interaction(user.id, id, request.interaction_type)
        .await?;

    tracing::debug!(
        request_id = %request_id,
        user_id = user.id,
        recipe_id = id,
        kind = %interaction.interaction_type,
        "Logged interaction"
    );

    Ok((StatusCode::CREATED, Json(interaction)))
}
