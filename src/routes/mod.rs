use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::TokenIssuer,
    config::Config,
    db::{Cache, Repository},
    middleware::{make_span_with_request_id, request_id_middleware},
    services::recommendations::{RecommendationService, RecommenderSettings},
};

pub mod auth;
pub mod extract;
pub mod ingredients;
pub mod recipes;
pub mod recommendations;
pub mod users;

/// Shared application state
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub recommender: Arc<RecommendationService>,
    pub tokens: TokenIssuer,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, cache: Option<Cache>, config: Config) -> Self {
        let recommender = Arc::new(RecommendationService::new(
            repo.clone(),
            cache,
            RecommenderSettings::from(&config),
        ));
        let tokens = TokenIssuer::new(&config.secret_key, config.access_token_expire_minutes);

        Self {
            repo,
            recommender,
            tokens,
            config: Arc::new(config),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(cors),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .route(
            "/users/me/preferences",
            get(users::get_preferences).put(users::replace_preferences),
        )
        .route("/users/me/favorites", get(users::list_favorites))
        .route(
            "/users/me/favorites/:recipe_id",
            post(users::add_favorite).delete(users::remove_favorite),
        )
        .route("/recipes", get(recipes::list).post(recipes::create))
        .route("/recipes/:id", get(recipes::get_one))
        .route("/recipes/:id/rate", post(recipes::rate))
        .route("/recipes/:id/interactions", post(recipes::log_interaction))
        .route("/ingredients", post(ingredients::create))
        .route("/ingredients/search", get(ingredients::search))
        .route(
            "/recommendations/personalized",
            get(recommendations::personalized),
        )
        .route(
            "/recommendations/similar/:recipe_id",
            get(recommendations::similar),
        )
        .route("/recommendations/train", post(recommendations::train))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Food Recommendation API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
