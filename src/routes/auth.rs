use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use crate::{
    auth::{hash_password, verify_password},
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{user::normalize_email, LoginForm, NewUser, RegisterRequest, Token, UserResponse},
    routes::{extract::{FormBody, JsonBody}, AppState},
};

/// Creates an account; emails listed in ADMIN_EMAILS become admins
pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    request.validate()?;
    let email = normalize_email(&request.email);
    let preferences = request.preferences.normalized()?;

    if state.repo.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let hashed_password = hash_password(request.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            is_admin: state.config.is_admin_email(&email),
            email,
            hashed_password,
            preferences,
        })
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = user.id,
        is_admin = user.is_admin,
        "Registered user"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Exchanges form credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    FormBody(form): FormBody<LoginForm>,
) -> AppResult<Json<Token>> {
    let invalid = || AppError::Unauthorized("Incorrect email or password".to_string());

    let user = state
        .repo
        .get_user_by_email(&normalize_email(&form.username))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(form.password, user.hashed_password.clone()).await? {
        tracing::info!(request_id = %request_id, user_id = user.id, "Rejected login");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(AppError::InvalidInput("Inactive user".to_string()));
    }

    let token = state.tokens.issue(&user.email)?;
    tracing::info!(request_id = %request_id, user_id = user.id, "Issued access token");

    Ok(Json(Token::bearer(token)))
}
