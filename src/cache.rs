use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, info};
use moka::future::Cache;

use crate::{
    api::{
        client::ApiClientResult,
        model::{ClientsQuery, ClientsResponse},
    },
    batch::ListInvalidator,
    settings::CacheSettings,
};

/// List pages fetched from upstream, keyed by their canonical query.
pub struct ClientListCache {
    entries: Cache<ClientsQuery, ClientsResponse>,
    /// Bumped on every invalidation. A fetch that straddles a bump is not stored.
    generation: AtomicU64,
}

impl ClientListCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(settings.max_entries)
                .time_to_live(Duration::from_secs(settings.ttl_secs))
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, query: &ClientsQuery, fetch: F) -> ApiClientResult<ClientsResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiClientResult<ClientsResponse>>,
    {
        if let Some(cached) = self.entries.get(query).await {
            debug!("Client list served from cache. [query = {query:?}]");
            return Ok(cached);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let response = fetch().await?;

        if self.generation.load(Ordering::SeqCst) == generation {
            self.entries.insert(query.clone(), response.clone()).await;
        } else {
            debug!("Client list invalidated while fetching, not caching it. [query = {query:?}]");
        }

        Ok(response)
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate_all();
    }
}

#[async_trait]
impl ListInvalidator for ClientListCache {
    async fn invalidate_list_cache(&self) {
        info!("Invalidating cached client lists.");
        self.invalidate_all();
    }
}
