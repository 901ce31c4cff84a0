use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    error::AppResult,
    models::{Ingredient, IngredientSearchQuery, NewIngredient},
    routes::{extract::{JsonBody, QueryParams}, AppState},
};

const DEFAULT_SEARCH_LIMIT: i64 = 20;
const MAX_SEARCH_LIMIT: i64 = 100;

pub async fn search(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<IngredientSearchQuery>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let ingredients = state
        .repo
        .search_ingredients(params.query.trim(), limit)
        .await?;
    Ok(Json(ingredients))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    JsonBody(ingredient): JsonBody<NewIngredient>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    let ingredient = state
        .repo
        .create_ingredient(ingredient.normalized()?)
        .await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}
