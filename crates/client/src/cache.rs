//! Client-side query cache with explicit, dependency-aware invalidation.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ClientError;

/// Identifies one cached server query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    ReportCatalog,
    SavedReports,
    Reservations,
    VehicleReservations(Uuid),
    Availability {
        vehicle_id: Uuid,
        start: NaiveDate,
        end: Option<NaiveDate>,
        exclude_id: Option<Uuid>,
    },
}

impl QueryKey {
    /// Whether invalidating `parent` must also drop this key.
    pub fn depends_on(&self, parent: &QueryKey) -> bool {
        match (self, parent) {
            (QueryKey::VehicleReservations(_), QueryKey::Reservations) => true,
            (QueryKey::Availability { .. }, QueryKey::Reservations) => true,
            (QueryKey::Availability { vehicle_id, .. }, QueryKey::VehicleReservations(v)) => {
                vehicle_id == v
            }
            _ => false,
        }
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    /// Bumped by every invalidation.
    generation: u64,
}

/// Cached query results keyed by [`QueryKey`].
#[derive(Default)]
pub struct QueryCache {
    state: RwLock<CacheState>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` if present and of type `T`.
    pub async fn get<T: Any + Send + Sync>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let state = self.state.read().await;
        let entry = state.entries.get(key)?.clone();
        match entry.downcast::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(?key, "Cached value has unexpected type, ignoring");
                None
            }
        }
    }

    pub async fn insert<T: Any + Send + Sync>(&self, key: QueryKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.state
            .write()
            .await
            .entries
            .insert(key, value.clone() as Entry);
        value
    }

    /// Returns the cached value or runs `fetch` and caches its result.
    ///
    /// Failed fetches are not cached, and neither is a result whose fetch
    /// overlapped an invalidation.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
    ) -> Result<Arc<T>, ClientError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if let Some(hit) = self.get::<T>(&key).await {
            return Ok(hit);
        }
        let generation = self.state.read().await.generation;
        let value = Arc::new(fetch().await?);

        let mut state = self.state.write().await;
        if state.generation == generation {
            state.entries.insert(key, value.clone() as Entry);
        } else {
            debug!(?key, "Invalidated while fetching, result not cached");
        }
        Ok(value)
    }

    /// Removes `key` and every key depending on it. Returns how many entries
    /// were dropped.
    pub async fn invalidate(&self, key: &QueryKey) -> usize {
        let mut state = self.state.write().await;
        state.generation += 1;
        let before = state.entries.len();
        state.entries.retain(|k, _| k != key && !k.depends_on(key));
        let removed = before - state.entries.len();
        debug!(?key, removed, "Invalidated cached queries");
        removed
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn availability(vehicle_id: Uuid) -> QueryKey {
        QueryKey::Availability {
            vehicle_id,
            start: d("2024-05-01"),
            end: Some(d("2024-05-03")),
            exclude_id: None,
        }
    }

    #[test]
    fn test_dependency_rules() {
        let v1 = Uuid::new_v4();
        let v2 = Uuid::new_v4();
        assert!(QueryKey::VehicleReservations(v1).depends_on(&QueryKey::Reservations));
        assert!(availability(v1).depends_on(&QueryKey::Reservations));
        assert!(availability(v1).depends_on(&QueryKey::VehicleReservations(v1)));
        assert!(!availability(v1).depends_on(&QueryKey::VehicleReservations(v2)));
        assert!(!QueryKey::SavedReports.depends_on(&QueryKey::Reservations));
        assert!(!QueryKey::Reservations.depends_on(&QueryKey::VehicleReservations(v1)));
    }

    #[test]
    fn test_invalidating_reservations_cascades() {
        tokio_test::block_on(async {
            let cache = QueryCache::new();
            let v1 = Uuid::new_v4();
            cache.insert(QueryKey::Reservations, 1u32).await;
            cache.insert(QueryKey::VehicleReservations(v1), 2u32).await;
            cache.insert(availability(v1), 3u32).await;
            cache.insert(QueryKey::SavedReports, 4u32).await;

            assert_eq!(cache.invalidate(&QueryKey::Reservations).await, 3);
            assert_eq!(cache.len().await, 1);
            assert!(cache.contains(&QueryKey::SavedReports).await);
        });
    }

    #[test]
    fn test_invalidating_one_vehicle_keeps_others() {
        tokio_test::block_on(async {
            let cache = QueryCache::new();
            let v1 = Uuid::new_v4();
            let v2 = Uuid::new_v4();
            cache.insert(QueryKey::VehicleReservations(v1), ()).await;
            cache.insert(availability(v1), ()).await;
            cache.insert(availability(v2), ()).await;

            assert_eq!(cache.invalidate(&QueryKey::VehicleReservations(v1)).await, 2);
            assert!(cache.contains(&availability(v2)).await);
        });
    }

    #[tokio::test]
    async fn test_get_or_fetch_hits_cache_after_first_call() {
        let cache = QueryCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ClientError>(vec!["weekly".to_string()])
        };

        let first = cache.get_or_fetch(QueryKey::SavedReports, fetch).await.unwrap();
        let second = cache.get_or_fetch(QueryKey::SavedReports, fetch).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = QueryCache::new();
        let result = cache
            .get_or_fetch::<Vec<String>, _, _>(QueryKey::SavedReports, || async {
                Err(ClientError::Server {
                    status: 503,
                    message: "down".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_fetch_overlapping_invalidation_is_not_cached() {
        let cache = Arc::new(QueryCache::new());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let pending = {
            let (cache, started, release) = (cache.clone(), started.clone(), release.clone());
            tokio::spawn(async move {
                cache
                    .get_or_fetch(QueryKey::SavedReports, || async move {
                        started.notify_one();
                        release.notified().await;
                        Ok::<_, ClientError>(vec!["deleted-report".to_string()])
                    })
                    .await
            })
        };

        started.notified().await;
        cache.invalidate(&QueryKey::SavedReports).await;
        release.notify_one();

        let fetched = pending.await.unwrap().unwrap();
        assert_eq!(*fetched, vec!["deleted-report".to_string()]);
        assert!(cache
            .get::<Vec<String>>(&QueryKey::SavedReports)
            .await
            .is_none());

        let fresh = cache
            .get_or_fetch(QueryKey::SavedReports, || async {
                Ok::<_, ClientError>(Vec::<String>::new())
            })
            .await
            .unwrap();
        assert!(fresh.is_empty());
        assert!(cache.contains(&QueryKey::SavedReports).await);
    }

    #[tokio::test]
    async fn test_wrong_type_is_a_miss() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::ReportCatalog, 7u8).await;
        assert!(cache.get::<String>(&QueryKey::ReportCatalog).await.is_none());
        assert_eq!(*cache.get::<u8>(&QueryKey::ReportCatalog).await.unwrap(), 7);
    }
}
