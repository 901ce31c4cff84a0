use serde::{Deserialize, Serialize};

use super::user_preferences::normalize_list;
use crate::error::{AppError, AppResult};

/// Catalog ingredient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub common_allergens: Vec<String>,
    pub source: Option<String>,
}

impl Ingredient {
    /// Whether any of this ingredient's allergens is in `allergies` (lowercase)
    pub fn contains_any_allergen(&self, allergies: &[String]) -> bool {
        self.common_allergens
            .iter()
            .any(|allergen| allergies.contains(&allergen.to_lowercase()))
    }
}

/// Ingredient to insert, from the API or an external source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewIngredient {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub common_allergens: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl NewIngredient {
    pub fn normalized(self) -> AppResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation(
                "Ingredient name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            category: self
                .category
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty()),
            common_allergens: normalize_list(self.common_allergens),
            source: self.source,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IngredientSearchQuery {
    pub query: String,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_any_allergen() {
        let ingredient = Ingredient {
            id: 1,
            name: "Peanut butter".to_string(),
            category: Some("spread".to_string()),
            common_allergens: vec!["Peanuts".to_string(), "nuts".to_string()],
            source: None,
        };

        assert!(ingredient.contains_any_allergen(&["peanuts".to_string()]));
        assert!(!ingredient.contains_any_allergen(&["dairy".to_string()]));
        assert!(!ingredient.contains_any_allergen(&[]));
    }

    #[test]
    fn test_normalized_rejects_blank_name() {
        let ingredient = NewIngredient {
            name: "   ".to_string(),
            category: None,
            common_allergens: vec![],
            source: None,
        };
        assert!(ingredient.normalized().is_err());
    }

    #[test]
    fn test_normalized_cleans_fields() {
        let ingredient = NewIngredient {
            name: " Cheddar ".to_string(),
            category: Some(" Dairy".to_string()),
            common_allergens: vec!["Milk".to_string(), "milk ".to_string()],
            source: Some("test".to_string()),
        }
        .normalized()
        .unwrap();

        assert_eq!(ingredient.name, "Cheddar");
        assert_eq!(ingredient.category.as_deref(), Some("dairy"));
        assert_eq!(ingredient.common_allergens, vec!["milk"]);
    }
}
