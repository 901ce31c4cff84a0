use axum::{
    extract::State,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    auth::{AdminUser, CurrentUser},
    error::AppResult,
    middleware::RequestId,
    models::{RecipeRecommendation, RecommendationQuery, TrainingSummary},
    routes::{extract::{PathParam, QueryParams}, AppState},
};

const DEFAULT_PERSONALIZED: usize = 10;
const DEFAULT_SIMILAR: usize = 5;

pub async fn personalized(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user): CurrentUser,
    QueryParams(query): QueryParams<RecommendationQuery>,
) -> AppResult<Json<Vec<RecipeRecommendation>>> {
    let n = query.count(DEFAULT_PERSONALIZED)?;
    tracing::info!(request_id = %request_id, user_id = user.id, n, "Processing personalized recommendations");

    let recommendations = state.recommender.get_recommendations(&user, n).await?;

    tracing::info!(
        request_id = %request_id,
        returned = recommendations.len(),
        "Personalized recommendations completed"
    );
    Ok(Json(recommendations))
}

pub async fn similar(
    State(state): State<Arc<AppState>>,
    PathParam(recipe_id): PathParam<i64>,
    QueryParams(query): QueryParams<RecommendationQuery>,
) -> AppResult<Json<Vec<RecipeRecommendation>>> {
    let n = query.count(DEFAULT_SIMILAR)?;
    let recommendations = state.recommender.similar_recipes(recipe_id, n).await?;
    Ok(Json(recommendations))
}

/// Rebuilds and persists the recommendation index
pub async fn train(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<TrainingSummary>> {
    tracing::info!(request_id = %request_id, admin_id = admin.id, "Training requested");
    let summary = state.recommender.train().await?;
    tracing::info!(
        request_id = %request_id,
        version = summary.version,
        recipes = summary.recipes,
        users = summary.users,
        "Training completed"
    );
    Ok(Json(summary))
}
