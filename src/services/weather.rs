use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use serde::Deserialize;

use crate::models::{WeatherCondition, WeatherContext};
use crate::services::cache::Cache;
use crate::services::source::{DegradedReason, SourceResult};
use crate::utils::retry::{retry_with_backoff, RetryContext, RetryPolicy};

const WEATHER_TTL: Duration = Duration::from_secs(2 * 3600);

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> anyhow::Result<WeatherContext>;
}

/// Open-Meteo current-conditions client. Locations are "lat,lon" pairs,
/// optionally suffixed with a display label ("52.52,13.40 Berlin").
pub struct HttpWeatherProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MeteoResponse {
    current: MeteoCurrent,
}

#[derive(Debug, Deserialize)]
struct MeteoCurrent {
    temperature_2m: f32,
    relative_humidity_2m: f32,
    wind_speed_10m: f32,
    weather_code: u32,
}

impl HttpWeatherProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl WeatherProvider for HttpWeatherProvider {
    async fn fetch(&self, location: &str) -> anyhow::Result<WeatherContext> {
        let (lat, lon) = parse_coordinates(location)
            .ok_or_else(|| anyhow::anyhow!("location {:?} has no coordinates", location))?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code".to_string(),
                ),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("weather API error {}", status);
        }

        let parsed: MeteoResponse = response.json().await?;
        Ok(WeatherContext {
            temperature_c: parsed.current.temperature_2m,
            condition: condition_from_code(parsed.current.weather_code),
            humidity_pct: parsed.current.relative_humidity_2m,
            wind_speed_kmh: parsed.current.wind_speed_10m,
            location: location.to_string(),
            observed_at: chrono::Utc::now().timestamp(),
        })
    }
}

fn parse_coordinates(location: &str) -> Option<(f64, f64)> {
    let coords = location.split_whitespace().next()?;
    let (lat, lon) = coords.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

// WMO weather interpretation codes.
fn condition_from_code(code: u32) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Sunny,
        1..=3 => WeatherCondition::Cloudy,
        45 | 48 => WeatherCondition::Foggy,
        51..=67 | 80..=82 | 95..=99 => WeatherCondition::Rainy,
        71..=77 | 85 | 86 => WeatherCondition::Snowy,
        _ => WeatherCondition::Cloudy,
    }
}

pub struct WeatherAdapter {
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<Cache>,
    policy: RetryPolicy,
}

impl WeatherAdapter {
    pub fn new(provider: Arc<dyn WeatherProvider>, cache: Arc<Cache>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            cache,
            policy,
        }
    }

    /// Live reading when the provider answers; otherwise the cached reading
    /// (the 2h TTL bounds its age) or a seasonal default. Never an error.
    pub async fn fetch(&self, user_id: &str, location: &str) -> SourceResult<WeatherContext> {
        let key = Cache::key("weather", location);
        let ctx = RetryContext::new("weather", "fetch", user_id);

        let attempt = retry_with_backoff(&ctx, &self.policy, || self.provider.fetch(location)).await;

        match attempt {
            Ok(reading) => {
                self.cache.put(&key, &reading, WEATHER_TTL);
                SourceResult::Fresh(reading)
            }
            Err(_) => {
                if let Some(cached) = self.cache.get::<WeatherContext>(&key) {
                    log::info!("weather degraded to cached reading for {}", location);
                    return SourceResult::Degraded {
                        value: cached,
                        reason: DegradedReason::StaleCache,
                    };
                }
                log::info!("weather degraded to seasonal default for {}", location);
                SourceResult::Degraded {
                    value: seasonal_default(location),
                    reason: DegradedReason::SeasonalDefault,
                }
            }
        }
    }
}

/// Rough month-based conditions used when both the provider and the cache
/// are unavailable. Southern-hemisphere coordinates shift the table by six
/// months.
pub fn seasonal_default(location: &str) -> WeatherContext {
    let mut month = chrono::Utc::now().month();
    if let Some((lat, _)) = parse_coordinates(location) {
        if lat < 0.0 {
            month = (month + 6 - 1) % 12 + 1;
        }
    }

    let (temperature_c, condition) = match month {
        12 | 1 | 2 => (2.0, WeatherCondition::Snowy),
        3 | 4 | 5 => (14.0, WeatherCondition::Cloudy),
        6 | 7 | 8 => (24.0, WeatherCondition::Sunny),
        _ => (11.0, WeatherCondition::Rainy),
    };

    WeatherContext {
        temperature_c,
        condition,
        humidity_pct: 60.0,
        wind_speed_kmh: 10.0,
        location: location.to_string(),
        observed_at: chrono::Utc::now().timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StaticProvider(WeatherContext);

    #[async_trait]
    impl WeatherProvider for StaticProvider {
        async fn fetch(&self, _location: &str) -> anyhow::Result<WeatherContext> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl WeatherProvider for FailingProvider {
        async fn fetch(&self, _location: &str) -> anyhow::Result<WeatherContext> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("connect timeout")
        }
    }

    fn reading(location: &str) -> WeatherContext {
        WeatherContext {
            temperature_c: 19.0,
            condition: WeatherCondition::Sunny,
            humidity_pct: 40.0,
            wind_speed_kmh: 5.0,
            location: location.to_string(),
            observed_at: chrono::Utc::now().timestamp(),
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
    async fn success_refreshes_cache() {
        let cache = cache();
        let adapter = WeatherAdapter::new(
            Arc::new(StaticProvider(reading("52.52,13.40"))),
            cache.clone(),
            fast_policy(),
        );

        let result = adapter.fetch("u1", "52.52,13.40").await;
        assert!(matches!(result, SourceResult::Fresh(_)));
        assert!(cache.get::<WeatherContext>("weather:52.52,13.40").is_some());
    }

    #[tokio::test]
    async fn failure_falls_back_to_cached_reading() {
        let cache = cache();
        cache.put("weather:52.52,13.40", &reading("52.52,13.40"), WEATHER_TTL);

        let adapter = WeatherAdapter::new(
            Arc::new(FailingProvider {
                calls: AtomicU32::new(0),
            }),
            cache,
            fast_policy(),
        );

        match adapter.fetch("u1", "52.52,13.40").await {
            SourceResult::Degraded { reason, .. } => {
                assert_eq!(reason, DegradedReason::StaleCache)
            }
            other => panic!("expected degraded result, got {:?}", other.value().is_some()),
        }
    }

    #[tokio::test]
    async fn failure_without_cache_synthesizes_seasonal_default() {
        let adapter = WeatherAdapter::new(
            Arc::new(FailingProvider {
                calls: AtomicU32::new(0),
            }),
            cache(),
            fast_policy(),
        );

        match adapter.fetch("u1", "52.52,13.40").await {
            SourceResult::Degraded { value, reason } => {
                assert_eq!(reason, DegradedReason::SeasonalDefault);
                assert_eq!(value.location, "52.52,13.40");
            }
            _ => panic!("expected seasonal default"),
        }
    }

    #[test]
    fn southern_latitudes_flip_the_season() {
        let north = seasonal_default("48.0,11.0");
        let south = seasonal_default("-33.9,151.2");
        // Six months apart lands in a different season whatever today is.
        assert_ne!(north.condition, south.condition);
    }

    #[test]
    fn wmo_codes_map_to_conditions() {
        assert_eq!(condition_from_code(0), WeatherCondition::Sunny);
        assert_eq!(condition_from_code(61), WeatherCondition::Rainy);
        assert_eq!(condition_from_code(73), WeatherCondition::Snowy);
        assert_eq!(condition_from_code(45), WeatherCondition::Foggy);
    }
}
