use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::User,
    routes::AppState,
};

/// Authenticated, active user resolved from a bearer token
pub struct CurrentUser(pub User);

/// Authenticated user holding admin rights
pub struct AdminUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

async fn resolve_user(parts: &Parts, state: &AppState) -> AppResult<User> {
    let token = bearer_token(&parts.headers)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
    let claims = state.tokens.verify(token)?;

    let user = state
        .repo
        .get_user_by_email(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;

    if !user.is_active {
        return Err(AppError::InvalidInput("Inactive user".to_string()));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state).await.map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("Not enough permissions".to_string()));
        }
        Ok(AdminUser(user))
    }
}
