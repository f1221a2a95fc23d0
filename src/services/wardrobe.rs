use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::WardrobeItem;
use crate::services::cache::Cache;
use crate::services::source::{DegradedReason, SourceResult};
use crate::utils::retry::{retry_with_backoff, RetryContext, RetryPolicy};

const WARDROBE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

#[async_trait]
pub trait WardrobeStore: Send + Sync {
    async fn list_items(&self, user_id: &str) -> anyhow::Result<Vec<WardrobeItem>>;
}

pub struct WardrobeAdapter {
    store: Arc<dyn WardrobeStore>,
    cache: Arc<Cache>,
    policy: RetryPolicy,
}

impl WardrobeAdapter {
    pub fn new(store: Arc<dyn WardrobeStore>, cache: Arc<Cache>, policy: RetryPolicy) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    /// Live inventory when the store answers; otherwise the cached snapshot
    /// (at most 7 days old). We never invent garments, so with no cache the
    /// result is `Empty`.
    pub async fn fetch(&self, user_id: &str) -> SourceResult<Vec<WardrobeItem>> {
        let key = Cache::key("wardrobe", user_id);
        let ctx = RetryContext::new("wardrobe", "list_items", user_id);

        let attempt =
            retry_with_backoff(&ctx, &self.policy, || self.store.list_items(user_id)).await;

        match attempt {
            Ok(items) => {
                self.cache.put(&key, &items, WARDROBE_TTL);
                SourceResult::Fresh(items)
            }
            Err(_) => match self.cache.get::<Vec<WardrobeItem>>(&key) {
                Some(snapshot) => {
                    log::info!("wardrobe degraded to cached snapshot for {}", user_id);
                    SourceResult::Degraded {
                        value: snapshot,
                        reason: DegradedReason::StaleCache,
                    }
                }
                None => {
                    log::warn!("wardrobe unavailable and uncached for {}", user_id);
                    SourceResult::Empty
                }
            },
        }
    }
}
