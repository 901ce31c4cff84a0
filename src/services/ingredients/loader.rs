use reqwest::Client as HttpClient;
use std::{collections::HashSet, sync::Arc, time::Duration};

use super::{EdamamSource, IngredientSource, OpenFoodFactsSource, SourceQuery, UsdaSource};
use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey, Repository},
    error::AppResult,
    models::NewIngredient,
};

const SOURCE_CACHE_TTL: u64 = 86400; // 1 day

/// Outcome of a full load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub requests: usize,
    pub failed_requests: usize,
    pub fetched: usize,
    pub unique: usize,
    pub inserted: usize,
}

/// Imports ingredients from every configured source into the catalog
pub struct IngredientLoader {
    repo: Arc<dyn Repository>,
    sources: Vec<Box<dyn IngredientSource>>,
    cache: Option<Cache>,
    delay: Duration,
}

impl IngredientLoader {
    pub fn new(
        repo: Arc<dyn Repository>,
        sources: Vec<Box<dyn IngredientSource>>,
        cache: Option<Cache>,
        delay: Duration,
    ) -> Self {
        Self {
            repo,
            sources,
            cache,
            delay,
        }
    }

    /// Loader over Open Food Facts plus whichever keyed sources are configured
    pub fn from_config(repo: Arc<dyn Repository>, cache: Option<Cache>, config: &Config) -> Self {
        let http_client = HttpClient::new();
        let mut sources: Vec<Box<dyn IngredientSource>> = vec![Box::new(
            OpenFoodFactsSource::new(http_client.clone(), config.openfoodfacts_url.clone()),
        )];

        match (&config.edamam_app_id, &config.edamam_app_key) {
            (Some(app_id), Some(app_key)) => sources.push(Box::new(EdamamSource::new(
                http_client.clone(),
                config.edamam_url.clone(),
                app_id.clone(),
                app_key.clone(),
            ))),
            _ => tracing::warn!("EDAMAM_APP_ID/EDAMAM_APP_KEY not set, skipping Edamam"),
        }

        match &config.usda_api_key {
            Some(api_key) => sources.push(Box::new(UsdaSource::new(
                http_client,
                config.usda_url.clone(),
                api_key.clone(),
            ))),
            None => tracing::warn!("USDA_API_KEY not set, skipping USDA"),
        }

        Self::new(
            repo,
            sources,
            cache,
            Duration::from_millis(config.loader_delay_ms),
        )
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Fetches every planned query, then inserts the names not yet stored
    ///
    /// Failed requests are logged and skipped. Only the final insert can fail
    /// the load.
    pub async fn load_all(&self) -> AppResult<LoadReport> {
        let mut report = LoadReport::default();
        let mut collected = Vec::new();

        for source in &self.sources {
            let plan = source.plan();
            tracing::info!(source = source.name(), requests = plan.len(), "Loading ingredients");

            for query in plan {
                if report.requests > 0 && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                report.requests += 1;

                match self.fetch(source.as_ref(), &query).await {
                    Ok(ingredients) => {
                        tracing::debug!(
                            source = source.name(),
                            query = %query,
                            count = ingredients.len(),
                            "Fetched ingredients"
                        );
                        collected.extend(ingredients);
                    }
                    Err(e) => {
                        report.failed_requests += 1;
                        tracing::error!(
                            source = source.name(),
                            query = %query,
                            error = %e,
                            "Ingredient fetch failed"
                        );
                    }
                }
            }
        }

        report.fetched = collected.len();
        let unique = dedup_by_name(collected);
        report.unique = unique.len();
        report.inserted = self.repo.insert_missing_ingredients(&unique).await?;

        tracing::info!(
            requests = report.requests,
            failed_requests = report.failed_requests,
            fetched = report.fetched,
            unique = report.unique,
            inserted = report.inserted,
            "Ingredient load finished"
        );
        Ok(report)
    }

    async fn fetch(
        &self,
        source: &dyn IngredientSource,
        query: &SourceQuery,
    ) -> AppResult<Vec<NewIngredient>> {
        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::IngredientSource {
                    source: source.name().to_string(),
                    query: query.to_string(),
                },
                SOURCE_CACHE_TTL,
                source.fetch(query)
            ),
            None => source.fetch(query).await,
        }
    }
}

/// Normalizes records and keeps the first of each case-insensitive name
pub fn dedup_by_name(ingredients: Vec<NewIngredient>) -> Vec<NewIngredient> {
    let mut seen = HashSet::new();
    ingredients
        .into_iter()
        .filter_map(|ingredient| ingredient.normalized().ok())
        .filter(|ingredient| seen.insert(ingredient.name.to_lowercase()))
        .collect()
}
