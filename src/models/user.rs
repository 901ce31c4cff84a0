use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserPreferences;
use crate::error::{AppError, AppResult};

const MIN_PASSWORD_LEN: usize = 8;

/// Stored user account
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub dietary_restrictions: Vec<String>,
    pub favorite_cuisines: Vec<String>,
    pub allergies: Vec<String>,
    pub food_flags: Vec<String>,
}

impl User {
    pub fn preferences(&self) -> UserPreferences {
        UserPreferences {
            dietary_restrictions: self.dietary_restrictions.clone(),
            favorite_cuisines: self.favorite_cuisines.clone(),
            allergies: self.allergies.clone(),
            food_flags: self.food_flags.clone(),
        }
    }

    pub fn set_preferences(&mut self, prefs: UserPreferences) {
        self.dietary_restrictions = prefs.dietary_restrictions;
        self.favorite_cuisines = prefs.favorite_cuisines;
        self.allergies = prefs.allergies;
        self.food_flags = prefs.food_flags;
    }
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub is_admin: bool,
    pub preferences: UserPreferences,
}

/// User profile returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub dietary_restrictions: Vec<String>,
    pub favorite_cuisines: Vec<String>,
    pub allergies: Vec<String>,
    pub food_flags: Vec<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_active: user.is_active,
            is_admin: user.is_admin,
            created_at: user.created_at,
            dietary_restrictions: user.dietary_restrictions.clone(),
            favorite_cuisines: user.favorite_cuisines.clone(),
            allergies: user.allergies.clone(),
            food_flags: user.food_flags.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub preferences: UserPreferences,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub dietary_restrictions: Option<Vec<String>>,
    pub favorite_cuisines: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub food_flags: Option<Vec<String>>,
}

/// OAuth2-style password form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(AppError::Validation(format!("Invalid email address: {}", email))),
    }
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
