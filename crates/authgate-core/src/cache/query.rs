use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: Instant,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }

    pub fn is_stale(&self, stale_time: Duration) -> bool {
        self.age() >= stale_time
    }
}

/// Query results keyed by name, served while younger than the stale time.
///
/// Stale entries are dropped when looked up; nothing runs in the background.
pub struct QueryCache<T> {
    stale_time: Duration,
    entries: Mutex<HashMap<String, CachedData<T>>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            stale_time,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn get_fresh(&self, key: &str) -> Option<T> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(cached) if !cached.is_stale(self.stale_time) => Some(cached.data.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, data: T) {
        self.lock().insert(key.into(), CachedData::new(data));
    }

    pub fn invalidate(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedData<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_then_stale() {
        let cache = QueryCache::new(Duration::from_secs(10));
        cache.insert("me", 1);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get_fresh("me"), Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get_fresh("me"), None);
        // Stale entry was dropped on lookup
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_refreshes_age() {
        let cache = QueryCache::new(Duration::from_secs(10));
        cache.insert("me", 1);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert("me", 2);
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get_fresh("me"), Some(2));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = QueryCache::new(Duration::from_secs(10));
        cache.insert("a", "x".to_string());
        cache.insert("b", "y".to_string());

        cache.invalidate("a");
        assert_eq!(cache.get_fresh("a"), None);
        assert_eq!(cache.get_fresh("b").as_deref(), Some("y"));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cached_data_age() {
        let cached = CachedData::new(vec![1]);
        assert!(cached.age() < Duration::from_secs(1));
        assert!(!cached.is_stale(Duration::from_secs(10)));
        assert!(cached.is_stale(Duration::ZERO));
    }
}
