use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::{fetch_json, normalize_allergens, IngredientSource, SourceQuery};
use crate::{
    error::{AppError, AppResult},
    models::NewIngredient,
};

const PAGES: u32 = 10;
const PAGE_SIZE: u32 = 100;

/// Open Food Facts product search, paged
#[derive(Clone)]
pub struct OpenFoodFactsSource {
    http_client: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub ingredients: Vec<ProductIngredient>,
}

#[derive(Debug, Deserialize)]
pub struct ProductIngredient {
    pub text: Option<String>,
    #[serde(default)]
    pub allergens: Option<String>,
}

impl OpenFoodFactsSource {
    pub fn new(http_client: HttpClient, base_url: String) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// Every product ingredient with a text label becomes a record
    pub fn parse(response: SearchResponse) -> Vec<NewIngredient> {
        response
            .products
            .into_iter()
            .flat_map(|product| product.ingredients)
            .filter_map(|ingredient| {
                let name = ingredient.text?.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(NewIngredient {
                    name,
                    category: None,
                    common_allergens: normalize_allergens(ingredient.allergens),
                    source: Some("openfoodfacts".to_string()),
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl IngredientSource for OpenFoodFactsSource {
    fn name(&self) -> &'static str {
        "openfoodfacts"
    }

    fn plan(&self) -> Vec<SourceQuery> {
        (1..=PAGES).map(SourceQuery::Page).collect()
    }

    async fn fetch(&self, query: &SourceQuery) -> AppResult<Vec<NewIngredient>> {
        let SourceQuery::Page(page) = query else {
            return Err(AppError::InvalidInput(format!(
                "Open Food Facts only supports paged queries, got {}",
                query
            )));
        };

        let request = self
            .http_client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("page", page.to_string()),
                ("page_size", PAGE_SIZE.to_string()),
                ("json", "1".to_string()),
            ]);

        let response: SearchResponse = fetch_json(request, "Open Food Facts API").await?;
        Ok(Self::parse(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_products() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "products": [
                    {"ingredients": [
                        {"text": "Test Ingredient", "allergens": "milk, eggs"},
                        {"id": "en:water"}
                    ]},
                    {"product_name": "No ingredients here"}
                ]
            }"#,
        )
        .unwrap();

        let ingredients = OpenFoodFactsSource::parse(response);
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "Test Ingredient");
        assert_eq!(ingredients[0].common_allergens, vec!["eggs", "milk"]);
        assert_eq!(ingredients[0].source.as_deref(), Some("openfoodfacts"));
    }

    #[test]
    fn test_plan_is_ten_pages() {
        let source = OpenFoodFactsSource::new(HttpClient::new(), "http://localhost".to_string());
        let plan = source.plan();
        assert_eq!(plan.first(), Some(&SourceQuery::Page(1)));
        assert_eq!(plan.last(), Some(&SourceQuery::Page(10)));
    }

    #[tokio::test]
    async fn test_term_query_rejected() {
        let source = OpenFoodFactsSource::new(HttpClient::new(), "http://localhost".to_string());
        let err = source
            .fetch(&SourceQuery::Term("fish".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
