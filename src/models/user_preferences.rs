use serde::{Deserialize, Serialize};

use super::FoodFlag;
use crate::error::{AppError, AppResult};

/// Dietary preferences used to filter and boost recommendations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    /// Tags that exclude a recipe when present (e.g. "meat")
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    /// Cuisines that receive a score boost
    #[serde(default)]
    pub favorite_cuisines: Vec<String>,
    /// Allergens that exclude a recipe when any ingredient contains them
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Food flags the user wants to avoid
    #[serde(default)]
    pub food_flags: Vec<String>,
}

impl UserPreferences {
    /// Creates empty preferences
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes every list and rejects unknown food flags
    pub fn normalized(self) -> AppResult<Self> {
        let prefs = Self {
            dietary_restrictions: normalize_list(self.dietary_restrictions),
            favorite_cuisines: normalize_list(self.favorite_cuisines),
            allergies: normalize_list(self.allergies),
            food_flags: normalize_list(self.food_flags),
        };
        validate_food_flags(&prefs.food_flags)?;
        Ok(prefs)
    }
}

/// Trims, lowercases and de-duplicates, keeping first occurrence order
pub fn normalize_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_lowercase();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

pub fn validate_food_flags(flags: &[String]) -> AppResult<()> {
    for flag in flags {
        flag.parse::<FoodFlag>().map_err(AppError::Validation)?;
    }
    Ok(())
}
