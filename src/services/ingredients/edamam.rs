use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::{category_plan, fetch_json, normalize_allergens, IngredientSource, SourceQuery};
use crate::{error::AppResult, models::NewIngredient};

/// Edamam food database parser, queried by category term
#[derive(Clone)]
pub struct EdamamSource {
    http_client: HttpClient,
    base_url: String,
    app_id: String,
    app_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ParserResponse {
    #[serde(default)]
    pub hints: Vec<Hint>,
}

#[derive(Debug, Deserialize)]
pub struct Hint {
    pub food: Option<Food>,
}

#[derive(Debug, Deserialize)]
pub struct Food {
    pub label: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

impl EdamamSource {
    pub fn new(http_client: HttpClient, base_url: String, app_id: String, app_key: String) -> Self {
        Self {
            http_client,
            base_url,
            app_id,
            app_key,
        }
    }

    pub fn parse(response: ParserResponse) -> Vec<NewIngredient> {
        response
            .hints
            .into_iter()
            .filter_map(|hint| {
                let food = hint.food?;
                let name = food.label?.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(NewIngredient {
                    name,
                    category: food.category,
                    common_allergens: normalize_allergens(food.allergens),
                    source: Some("edamam".to_string()),
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl IngredientSource for EdamamSource {
    fn name(&self) -> &'static str {
        "edamam"
    }

    fn plan(&self) -> Vec<SourceQuery> {
        category_plan()
    }

    async fn fetch(&self, query: &SourceQuery) -> AppResult<Vec<NewIngredient>> {
        let term = query.to_string();
        let request = self
            .http_client
            .get(format!("{}/parser", self.base_url))
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("ingr", term.as_str()),
            ]);

        let response: ParserResponse = fetch_json(request, "Edamam API").await?;
        Ok(Self::parse(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hints() {
        let response: ParserResponse = serde_json::from_str(
            r#"{
                "hints": [
                    {"food": {"label": "Test Ingredient", "category": "Generic foods", "allergens": ["Milk", "eggs"]}},
                    {"food": {"foodId": "no-label"}},
                    {"measures": []}
                ]
            }"#,
        )
        .unwrap();

        let ingredients = EdamamSource::parse(response);
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "Test Ingredient");
        assert_eq!(ingredients[0].category.as_deref(), Some("Generic foods"));
        assert_eq!(ingredients[0].common_allergens, vec!["eggs", "milk"]);
        assert_eq!(ingredients[0].source.as_deref(), Some("edamam"));
    }

    #[test]
    fn test_missing_hints_is_empty() {
        let response: ParserResponse = serde_json::from_str("{}").unwrap();
        assert!(EdamamSource::parse(response).is_empty());
    }
}
