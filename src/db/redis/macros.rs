/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues the result for a background write with `$ttl` seconds to
/// live, and returns it. Cache read failures propagate through `?` like any
/// other `AppError`.
///
/// ```rust,ignore
/// let hits: Vec<RecipeRecommendation> = cached!(
///     cache,
///     CacheKey::SimilarRecipes { recipe_id, limit, index_version },
///     ttl,
///     async { scan_similar(recipe_id, limit).await }
/// )?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(cached)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                $block.await.inspect(|value| {
                    $cache.set_in_background(&key, value, $ttl);
                })
            }
            Err(e) => Err(e),
        }
    }};
}
