use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::{AppError, AppResult};

/// Kind of logged user action on a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Save,
    Cook,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Save => "save",
            InteractionKind::Cook => "cook",
        }
    }

    /// Implicit-feedback weight used by collaborative filtering
    pub fn weight(&self) -> f64 {
        match self {
            InteractionKind::View => 0.5,
            InteractionKind::Save => 2.0,
            InteractionKind::Cook => 3.0,
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(InteractionKind::View),
            "save" => Ok(InteractionKind::Save),
            "cook" => Ok(InteractionKind::Cook),
            other => Err(AppError::Internal(format!(
                "Unknown interaction type in storage: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub id: i64,
    pub user_id: i64,
    pub recipe_id: i64,
    pub interaction_type: InteractionKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub interaction_type: InteractionKind,
}

/// Star rating, one per user and recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub recipe_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

impl RatingRequest {
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::Validation(format!(
                "Rating must be between 1 and 5, got {}",
                self.rating
            )));
        }
        Ok(())
    }
}
