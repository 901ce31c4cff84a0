use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::{category_plan, fetch_json, normalize_allergens, IngredientSource, SourceQuery};
use crate::{error::AppResult, models::NewIngredient};

const PAGE_SIZE: u32 = 25;

/// USDA FoodData Central search, queried by category term
#[derive(Clone)]
pub struct UsdaSource {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct FoodSearchResponse {
    #[serde(default)]
    pub foods: Vec<Food>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub description: Option<String>,
    pub food_category: Option<String>,
    pub allergen_name: Option<String>,
}

impl UsdaSource {
    pub fn new(http_client: HttpClient, base_url: String, api_key: String) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
        }
    }

    pub fn parse(response: FoodSearchResponse) -> Vec<NewIngredient> {
        response
            .foods
            .into_iter()
            .filter_map(|food| {
                let name = food.description?.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(NewIngredient {
                    name,
                    category: food.food_category,
                    common_allergens: normalize_allergens(food.allergen_name),
                    source: Some("usda".to_string()),
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl IngredientSource for UsdaSource {
    fn name(&self) -> &'static str {
        "usda"
    }

    fn plan(&self) -> Vec<SourceQuery> {
        category_plan()
    }

    async fn fetch(&self, query: &SourceQuery) -> AppResult<Vec<NewIngredient>> {
        let request = self
            .http_client
            .get(format!("{}/foods/search", self.base_url))
            .query(&[
                ("api_key", self.api_key.clone()),
                ("query", query.to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
            ]);

        let response: FoodSearchResponse = fetch_json(request, "USDA API").await?;
        Ok(Self::parse(response))
    }
}
