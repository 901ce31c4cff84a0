pub mod memory;
pub mod postgres;
pub mod redis;
pub mod repository;

pub use memory::MemoryRepository;
pub use postgres::{create_pool, run_migrations, PgRepository};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use repository::Repository;

use std::sync::Arc;

use crate::config::Config;

/// Opens the configured store, running migrations against Postgres
pub async fn open_repository(config: &Config, in_memory: bool) -> anyhow::Result<Arc<dyn Repository>> {
    if in_memory {
        tracing::warn!("Using the in-memory repository, data will not persist");
        return Ok(Arc::new(MemoryRepository::new()));
    }

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    Ok(Arc::new(PgRepository::new(pool)))
}

/// Starts the Redis cache when `REDIS_URL` is set
pub fn open_cache(config: &Config) -> anyhow::Result<Option<(Cache, CacheWriterHandle)>> {
    match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url)?;
            tracing::info!("Redis cache enabled");
            Ok(Some(Cache::new(client)))
        }
        None => {
            tracing::info!("REDIS_URL not set, caching disabled");
            Ok(None)
        }
    }
}
