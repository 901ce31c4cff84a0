//! External ingredient sources and the loader that imports them
//!
//! Each source turns a planned list of queries (result pages or search
//! terms) into [`NewIngredient`] records. The loader walks every plan,
//! de-duplicates the results and inserts names the catalog does not have.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::fmt::Display;

use crate::{
    error::{AppError, AppResult},
    models::NewIngredient,
};

pub mod edamam;
pub mod loader;
pub mod openfoodfacts;
pub mod usda;

pub use edamam::EdamamSource;
pub use loader::{IngredientLoader, LoadReport};
pub use openfoodfacts::OpenFoodFactsSource;
pub use usda::UsdaSource;

/// Search terms used for sources queried by keyword
pub const CATEGORIES: [&str; 10] = [
    "vegetables",
    "fruits",
    "meat",
    "fish",
    "dairy",
    "grains",
    "spices",
    "herbs",
    "nuts",
    "seeds",
];

/// One request a source will make
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceQuery {
    Page(u32),
    Term(String),
}

impl Display for SourceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceQuery::Page(page) => write!(f, "page-{}", page),
            SourceQuery::Term(term) => write!(f, "{}", term),
        }
    }
}

pub(crate) fn category_plan() -> Vec<SourceQuery> {
    CATEGORIES
        .iter()
        .map(|c| SourceQuery::Term(c.to_string()))
        .collect()
}

/// Provider of ingredient records
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait IngredientSource: Send + Sync {
    /// Source name, stored on each imported ingredient
    fn name(&self) -> &'static str;

    /// Every query a full load issues, in order
    fn plan(&self) -> Vec<SourceQuery>;

    async fn fetch(&self, query: &SourceQuery) -> AppResult<Vec<NewIngredient>>;
}

/// Sends a request and decodes its JSON body, treating non-2xx as an error
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    source: &str,
) -> AppResult<T> {
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::ExternalApi(format!(
            "{} returned status {}: {}",
            source, status, body
        )));
    }

    Ok(response.json().await?)
}

/// Normalizes raw allergen labels
///
/// Comma-separated entries are split, trimmed and lowercased, a language
/// prefix such as `en:` is removed, and the result is sorted and unique.
pub fn normalize_allergens<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut allergens: Vec<String> = raw
        .into_iter()
        .flat_map(|entry| {
            entry
                .as_ref()
                .split(',')
                .map(|part| strip_language_prefix(part.trim()).to_lowercase())
                .collect::<Vec<_>>()
        })
        .filter(|a| !a.is_empty())
        .collect();

    allergens.sort();
    allergens.dedup();
    allergens
}

fn strip_language_prefix(value: &str) -> &str {
    match value.split_once(':') {
        Some((lang, rest)) if lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim()
        }
        _ => value,
    }
}
