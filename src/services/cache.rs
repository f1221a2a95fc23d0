use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::{queries, Database};

/// TTL cache over the `cache_entries` table. Keys are namespaced per
/// entity and user (`"weather:berlin"`, `"wardrobe:u1"`) so concurrent
/// requests for different users never touch the same row. Storage or
/// serialization trouble is always treated as a miss, never an error.
pub struct Cache {
    db: Arc<Database>,
}

impl Cache {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn key(entity: &str, scope: &str) -> String {
        format!("{}:{}", entity, scope.to_lowercase())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = chrono::Utc::now().timestamp();
        let blob = match self.db.with_conn(|conn| queries::cache_get(conn, key, now)) {
            Ok(blob) => blob?,
            Err(e) => {
                log::warn!("cache read failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_slice(&blob) {
            Ok(value) => Some(value),
            Err(e) => {
                // Corrupt entry: drop it and report a miss.
                log::warn!("cache entry {} is corrupt, evicting: {}", key, e);
                self.invalidate(key);
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let expires_at = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        let blob = match serde_json::to_vec(value) {
            Ok(blob) => blob,
            Err(e) => {
                log::warn!("cache serialize failed for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self
            .db
            .with_conn(|conn| queries::cache_put(conn, key, &blob, expires_at))
        {
            log::warn!("cache write failed for {}: {}", key, e);
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Err(e) = self.db.with_conn(|conn| queries::cache_remove(conn, key)) {
            log::warn!("cache invalidate failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> Cache {
        Cache::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn roundtrips_values() {
        let cache = cache();
        cache.put("weather:berlin", &vec![1, 2, 3], Duration::from_secs(60));
        let got: Option<Vec<i32>> = cache.get("weather:berlin");
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[test]
    fn expired_entry_is_a_miss_and_evicted() {
        let cache = cache();
        let key = "wardrobe:u1";
        // Already-expired row written directly, as if time had passed.
        let past = chrono::Utc::now().timestamp() - 10;
        cache
            .db
            .with_conn(|conn| queries::cache_put(conn, key, b"[1]", past))
            .unwrap();

        let got: Option<Vec<i32>> = cache.get(key);
        assert!(got.is_none());

        let rows: i64 = cache
            .db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_key = ?1",
                    [key],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let cache = cache();
        let key = "style:u1";
        let future = chrono::Utc::now().timestamp() + 600;
        cache
            .db
            .with_conn(|conn| queries::cache_put(conn, key, b"not json", future))
            .unwrap();

        let got: Option<Vec<i32>> = cache.get(key);
        assert!(got.is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = cache();
        cache.put("weather:oslo", &"v", Duration::from_secs(60));
        cache.invalidate("weather:oslo");
        let got: Option<String> = cache.get("weather:oslo");
        assert!(got.is_none());
    }

    #[test]
    fn keys_are_namespaced_per_user() {
        let cache = cache();
        cache.put(&Cache::key("wardrobe", "u1"), &1, Duration::from_secs(60));
        cache.put(&Cache::key("wardrobe", "u2"), &2, Duration::from_secs(60));
        assert_eq!(cache.get::<i32>("wardrobe:u1"), Some(1));
        assert_eq!(cache.get::<i32>("wardrobe:u2"), Some(2));
    }
}
