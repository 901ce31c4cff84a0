use axum::{
    extract::State,
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    auth::{hash_password, CurrentUser},
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{
        user::{normalize_email, validate_email, validate_password},
        InteractionKind, Recipe, UserPreferences, UserResponse, UserUpdate,
    },
    routes::{extract::{JsonBody, PathParam}, AppState},
};

pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// Applies the fields present in the update
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(mut user): CurrentUser,
    JsonBody(update): JsonBody<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    if let Some(email) = update.email {
        validate_email(&email)?;
        let email = normalize_email(&email);
        if let Some(existing) = state.repo.get_user_by_email(&email).await? {
            if existing.id != user.id {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
        user.email = email;
    }

    if let Some(password) = update.password {
        validate_password(&password)?;
        user.hashed_password = hash_password(password, state.config.bcrypt_cost).await?;
    }

    let mut prefs = user.preferences();
    if let Some(values) = update.dietary_restrictions {
        prefs.dietary_restrictions = values;
    }
    if let Some(values) = update.favorite_cuisines {
        prefs.favorite_cuisines = values;
    }
    if let Some(values) = update.allergies {
        prefs.allergies = values;
    }
    if let Some(values) = update.food_flags {
        prefs.food_flags = values;
    }
    user.set_preferences(prefs.normalized()?);

    let updated = state.repo.update_user(&user).await?;
    tracing::info!(request_id = %request_id, user_id = updated.id, "Updated user profile");

    Ok(Json(UserResponse::from(&updated)))
}

pub async fn get_preferences(CurrentUser(user): CurrentUser) -> Json<UserPreferences> {
    Json(user.preferences())
}

/// Replaces all four preference lists
pub async fn replace_preferences(
    State(state): State<Arc<AppState>>,
    CurrentUser(mut user): CurrentUser,
    JsonBody(prefs): JsonBody<UserPreferences>,
) -> AppResult<Json<UserPreferences>> {
    user.set_preferences(prefs.normalized()?);
    let updated = state.repo.update_user(&user).await?;
    Ok(Json(updated.preferences()))
}

pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Recipe>>> {
    let favorites = state.repo.favorite_recipes(user.id).await?;
    Ok(Json(favorites))
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user): CurrentUser,
    PathParam(recipe_id): PathParam<i64>,
) -> AppResult<Json<Value>> {
    state
        .repo
        .add_interaction(user.id, recipe_id, InteractionKind::Save)
        .await?;

    tracing::info!(request_id = %request_id, user_id = user.id, recipe_id, "Saved favorite");
    Ok(Json(json!({ "message": "Recipe added to favorites" })))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(recipe_id): PathParam<i64>,
) -> AppResult<Json<Value>> {
    let removed = state
        .repo
        .remove_interaction(user.id, recipe_id, InteractionKind::Save)
        .await?;

    if !removed {
        return Err(AppError::NotFound("Recipe not found in favorites".to_string()));
    }
    Ok(Json(json!({ "message": "Recipe removed from favorites" })))
}
