use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, watch, Mutex};

use super::error::{ClientError, ClientResult};

// Resource tags declared by queries and invalidated by mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    User,
    Category,
    Expense,
}

// Cache identity: endpoint plus the serialized request parameters.
// Every distinct parameter combination is an independent entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub endpoint: String,
    pub params: String,
}

impl QueryKey {
    pub fn bare(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params: String::new(),
        }
    }

    pub fn with_params(endpoint: &str, params: &[(String, String)]) -> Self {
        let params = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<String>>()
            .join("&");
        Self {
            endpoint: endpoint.to_string(),
            params,
        }
    }
}

// State of a mounted query as observed through its watch handle.
#[derive(Debug, Clone)]
pub enum QueryState {
    Loading,
    Ready(Value),
    Failed(ClientError),
}

struct CacheEntry {
    value: Value,
    tags: Vec<Tag>,
}

struct CacheInner {
    entries: HashMap<QueryKey, CacheEntry>,
    in_flight: HashMap<QueryKey, broadcast::Sender<ClientResult<Value>>>,
    // Bumped by invalidate. A fetch dispatched before the bump carries
    // pre-mutation data and must not repopulate the cache.
    generation: u64,
}

/* Resource cache.
 * Serves cached reads, deduplicates identical in-flight queries, and on
 * mutation success drops every entry carrying a declared tag so the next
 * read refetches. Mounted queries (watch_query) additionally refetch on
 * their own when one of their tags is invalidated.
 *
 * The cache is the sole writer of entries; callers only ever see clones.
 */
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Mutex<CacheInner>>,
    invalidations: broadcast::Sender<Tag>,
}

impl Cache {
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                generation: 0,
            })),
            invalidations,
        }
    }

    /* Query path.
     * Cached value is served as-is. A concurrent identical query joins the
     * in-flight request instead of issuing its own. A miss runs the fetch,
     * stores the result under the declared tags, and shares it with any
     * joined callers.
     */
    pub async fn query_with<F, Fut>(
        &self,
        key: QueryKey,
        tags: &[Tag],
        fetch: F,
    ) -> ClientResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<Value>>,
    {
        let (joined, dispatched_at) = {
            let mut inner = self.inner.lock().await;
            if let Some(entry) = inner.entries.get(&key) {
                log::debug!("Cache hit: {} {}", key.endpoint, key.params);
                return Ok(entry.value.clone());
            }
            let generation = inner.generation;
            match inner.in_flight.get(&key) {
                Some(tx) => (Some(tx.subscribe()), generation),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inner.in_flight.insert(key.clone(), tx);
                    (None, generation)
                }
            }
        };

        if let Some(mut rx) = joined {
            log::debug!("Joining in-flight query: {}", key.endpoint);
            return match rx.recv().await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Transport(
                    "Shared request was abandoned".to_string(),
                )),
            };
        }

        let result = fetch().await;

        let tx = {
            let mut inner = self.inner.lock().await;
            let tx = inner.in_flight.remove(&key);
            // If an invalidation landed while the fetch was in flight,
            // the result predates the mutation: return it to callers but
            // leave the cache empty so the next read refetches.
            if inner.generation != dispatched_at {
                log::debug!(
                    "Not caching {} (tag invalidated while in flight)",
                    key.endpoint
                );
            } else if let Ok(value) = &result {
                inner.entries.insert(
                    key,
                    CacheEntry {
                        value: value.clone(),
                        tags: tags.to_vec(),
                    },
                );
            }
            tx
        };
        if let Some(tx) = tx {
            let _ = tx.send(result.clone());
        }

        result
    }

    /* Mutation path.
     * Runs the write; on success the declared tags are invalidated
     * synchronously before the result is returned, so a query issued
     * afterwards is guaranteed to refetch. On failure nothing is touched
     * and the error surfaces once to the caller.
     */
    pub async fn mutate_with<F, Fut>(&self, invalidates: &[Tag], run: F) -> ClientResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<Value>>,
    {
        let value = run().await?;
        self.invalidate(invalidates).await;
        Ok(value)
    }

    // Drops every entry carrying one of the tags and wakes mounted queries.
    pub async fn invalidate(&self, tags: &[Tag]) {
        if tags.is_empty() {
            return;
        }

        {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            let before = inner.entries.len();
            inner
                .entries
                .retain(|_, entry| !entry.tags.iter().any(|tag| tags.contains(tag)));
            log::debug!(
                "Invalidated {:?}: dropped {} cache entries",
                tags,
                before - inner.entries.len()
            );
        }

        for tag in tags {
            let _ = self.invalidations.send(*tag);
        }
    }

    /* Mounted query.
     * Fetches immediately and refetches whenever one of its tags is
     * invalidated, publishing each state through the returned watch
     * handle. Dropping the handle unmounts the query and ends its task.
     */
    pub fn watch_query<F, Fut>(
        &self,
        key: QueryKey,
        tags: Vec<Tag>,
        fetch: F,
    ) -> watch::Receiver<QueryState>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<Value>> + Send,
    {
        let (tx, rx) = watch::channel(QueryState::Loading);
        let cache = self.clone();
        // Subscribe before spawning so no invalidation slips past.
        let mut invalidations = self.invalidations.subscribe();

        tokio::spawn(async move {
            loop {
                let state = match cache.query_with(key.clone(), &tags, || fetch()).await {
                    Ok(value) => QueryState::Ready(value),
                    Err(e) => QueryState::Failed(e),
                };
                if tx.send(state).is_err() {
                    return;
                }

                loop {
                    tokio::select! {
                        _ = tx.closed() => return,
                        received = invalidations.recv() => match received {
                            Ok(tag) if tags.contains(&tag) => break,
                            Ok(_) => continue,
                            Err(broadcast::error::RecvError::Lagged(_)) => break,
                            Err(broadcast::error::RecvError::Closed) => return,
                        },
                    }
                }
            }
        });

        rx
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn counting_fetch(counter: Arc<AtomicUsize>) -> impl Fn() -> ClientResult<Value> {
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(json!({ "fetched": n }))
        }
    }

    #[tokio::test]
    async fn test_cached_value_served_without_refetch() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(counter.clone());
        let key = QueryKey::bare("/categories");

        let first = cache
            .query_with(key.clone(), &[Tag::Category], || async { fetch() })
            .await
            .unwrap();
        let second = cache
            .query_with(key, &[Tag::Category], || async { fetch() })
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_queries_share_one_fetch() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::bare("/expenses");

        let slow_fetch = || {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "expenses": [] }))
            }
        };

        let (a, b) = tokio::join!(
            cache.query_with(key.clone(), &[Tag::Expense], slow_fetch),
            cache.query_with(key.clone(), &[Tag::Expense], slow_fetch),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mutation_success_invalidates_tag() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(counter.clone());
        let key = QueryKey::bare("/categories");

        cache
            .query_with(key.clone(), &[Tag::Category], || async { fetch() })
            .await
            .unwrap();

        cache
            .mutate_with(&[Tag::Category], || async { Ok(json!({ "success": true })) })
            .await
            .unwrap();

        let refetched = cache
            .query_with(key, &[Tag::Category], || async { fetch() })
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(refetched, json!({ "fetched": 2 }));
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache_untouched() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(counter.clone());
        let key = QueryKey::bare("/categories");

        let original = cache
            .query_with(key.clone(), &[Tag::Category], || async { fetch() })
            .await
            .unwrap();

        let failed = cache
            .mutate_with(&[Tag::Category], || async {
                Err(ClientError::Api("Title already exists".to_string()))
            })
            .await;
        assert!(failed.is_err());

        // Prior data is still served, no refetch happened.
        let after = cache
            .query_with(key, &[Tag::Category], || async { fetch() })
            .await
            .unwrap();
        assert_eq!(after, original);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidation_spares_other_tags() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(counter.clone());

        cache
            .query_with(QueryKey::bare("/expenses"), &[Tag::Expense], || async {
                fetch()
            })
            .await
            .unwrap();

        cache.invalidate(&[Tag::Category]).await;

        cache
            .query_with(QueryKey::bare("/expenses"), &[Tag::Expense], || async {
                fetch()
            })
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_params_are_distinct_entries() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(counter.clone());

        let page_one = QueryKey::with_params(
            "/expenses",
            &[("page".to_string(), "1".to_string())],
        );
        let page_two = QueryKey::with_params(
            "/expenses",
            &[("page".to_string(), "2".to_string())],
        );

        cache
            .query_with(page_one, &[Tag::Expense], || async { fetch() })
            .await
            .unwrap();
        cache
            .query_with(page_two, &[Tag::Expense], || async { fetch() })
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    // A fetch dispatched before a mutation resolves with pre-mutation
    // data; it must not land in the cache, so the next query refetches.
    #[tokio::test]
    async fn test_inflight_result_not_cached_past_invalidation() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::bare("/categories");
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let in_flight = {
            let cache = cache.clone();
            let counter = counter.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .query_with(key, &[Tag::Category], move || async move {
                        release_rx.await.ok();
                        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        Ok(json!({ "fetched": n }))
                    })
                    .await
            })
        };
        // Let the query register and suspend inside its fetch.
        tokio::task::yield_now().await;

        cache
            .mutate_with(&[Tag::Category], || async { Ok(json!({ "success": true })) })
            .await
            .unwrap();
        release_tx.send(()).unwrap();

        // The caller still gets the stale in-flight result once.
        let stale = in_flight.await.unwrap().unwrap();
        assert_eq!(stale, json!({ "fetched": 1 }));

        // But a query issued after the mutation refetches.
        let fetch = counting_fetch(counter.clone());
        let fresh = cache
            .query_with(key, &[Tag::Category], || async { fetch() })
            .await
            .unwrap();
        assert_eq!(fresh, json!({ "fetched": 2 }));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    // Create-then-list flow against a simulated backend: the list query
    // issued after a successful create reflects the new row, and the
    // backend-computed total is carried verbatim.
    #[tokio::test]
    async fn test_create_then_list_reflects_mutation() {
        let cache = Cache::new();
        let backend = Arc::new(std::sync::Mutex::new(Vec::<Value>::new()));
        let key = QueryKey::bare("/expenses");

        let list = |backend: Arc<std::sync::Mutex<Vec<Value>>>| {
            move || {
                let backend = backend.clone();
                async move {
                    let rows = backend.lock().unwrap().clone();
                    Ok(json!({ "expenses": rows }))
                }
            }
        };

        let empty = cache
            .query_with(key.clone(), &[Tag::Expense], list(backend.clone()))
            .await
            .unwrap();
        assert_eq!(empty["expenses"].as_array().unwrap().len(), 0);

        cache
            .mutate_with(&[Tag::Expense], || async {
                let row = json!({ "qty": 3, "amount": 10, "totalAmount": 30 });
                backend.lock().unwrap().push(row.clone());
                Ok(json!({ "success": true, "expense": row }))
            })
            .await
            .unwrap();

        let after = cache
            .query_with(key, &[Tag::Expense], list(backend.clone()))
            .await
            .unwrap();
        let rows = after["expenses"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["totalAmount"], json!(30));
    }

    #[tokio::test]
    async fn test_mounted_query_refetches_on_invalidation() {
        let cache = Cache::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let fetch = {
            let counter = counter.clone();
            move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(json!({ "fetched": n }))
                }
            }
        };

        let mut rx = cache.watch_query(QueryKey::bare("/categories"), vec![Tag::Category], fetch);

        rx.changed().await.unwrap();
        match rx.borrow().clone() {
            QueryState::Ready(value) => assert_eq!(value, json!({ "fetched": 1 })),
            other => panic!("Expected first fetch, got {other:?}"),
        }

        cache.invalidate(&[Tag::Category]).await;

        rx.changed().await.unwrap();
        let refetched = rx.borrow().clone();
        match refetched {
            QueryState::Ready(value) => assert_eq!(value, json!({ "fetched": 2 })),
            other => panic!("Expected refetch, got {other:?}"),
        }
    }
}
