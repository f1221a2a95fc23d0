use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::StyleProfile;
use crate::services::cache::Cache;
use crate::services::source::{DegradedReason, SourceResult};
use crate::utils::retry::{retry_with_backoff, RetryContext, RetryPolicy};

const STYLE_PROFILE_TTL: Duration = Duration::from_secs(24 * 3600);

#[async_trait]
pub trait StyleProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> anyhow::Result<StyleProfile>;
}

pub struct StyleProfileAdapter {
    store: Arc<dyn StyleProfileStore>,
    cache: Arc<Cache>,
    policy: RetryPolicy,
}

impl StyleProfileAdapter {
    pub fn new(store: Arc<dyn StyleProfileStore>, cache: Arc<Cache>, policy: RetryPolicy) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    /// Live profile when the store answers, cached profile when it doesn't,
    /// neutral profile when nothing is known. Never an error.
    pub async fn fetch(&self, user_id: &str) -> SourceResult<StyleProfile> {
        let key = Cache::key("style", user_id);
        let ctx = RetryContext::new("style_profile", "get", user_id);

        let attempt = retry_with_backoff(&ctx, &self.policy, || self.store.get(user_id)).await;

        match attempt {
            Ok(profile) => {
                self.cache.put(&key, &profile, STYLE_PROFILE_TTL);
                SourceResult::Fresh(profile)
            }
            Err(_) => match self.cache.get::<StyleProfile>(&key) {
                Some(profile) => {
                    log::info!("style profile degraded to cache for {}", user_id);
                    SourceResult::Degraded {
                        value: profile,
                        reason: DegradedReason::StaleCache,
                    }
                }
                None => {
                    log::info!("style profile degraded to neutral default for {}", user_id);
                    SourceResult::Degraded {
                        value: StyleProfile::neutral(user_id),
                        reason: DegradedReason::NeutralDefault,
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    struct DownStore;

    #[async_trait]
    impl StyleProfileStore for DownStore {
        async fn get(&self, _user_id: &str) -> anyhow::Result<StyleProfile> {
            anyhow::bail!("profile service down")
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn cache() -> Arc<Cache> {
        Arc::new(Cache::new(Arc::new(Database::open_in_memory().unwrap())))
    }

    #[tokio::test]
    async fn outage_serves_cached_profile() {
        let cache = cache();
        let mut profile = StyleProfile::neutral("u1");
        profile.preferred_colors = vec!["green".to_string()];
        cache.put("style:u1", &profile, STYLE_PROFILE_TTL);

        let adapter = StyleProfileAdapter::new(Arc::new(DownStore), cache, fast_policy());
        match adapter.fetch("u1").await {
            SourceResult::Degraded { value, reason } => {
                assert_eq!(reason, DegradedReason::StaleCache);
                assert!(value.likes_color("green"));
            }
            _ => panic!("expected cached profile"),
        }
    }

    #[tokio::test]
    async fn outage_without_cache_is_neutral() {
        let adapter = StyleProfileAdapter::new(Arc::new(DownStore), cache(), fast_policy());
        match adapter.fetch("u1").await {
            SourceResult::Degraded { value, reason } => {
                assert_eq!(reason, DegradedReason::NeutralDefault);
                assert!(value.preferred_colors.is_empty());
                assert_eq!(value.occasion_weights.get("casual"), Some(&0.5));
            }
            _ => panic!("expected neutral profile"),
        }
    }
}
