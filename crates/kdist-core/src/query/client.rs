use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, trace};

use super::key::QueryKey;
use super::options::{MutationState, QueryOptions, QueryState, RetryPolicy};
use crate::error::CoreError;

type Erased = Arc<dyn Any + Send + Sync>;

struct Cached {
    data: Erased,
    fetched_at: Instant,
    /// Set by invalidation; the data stays readable but is never served as
    /// fresh again.
    stale: bool,
}

#[derive(Default)]
struct Entry {
    cached: Option<Cached>,
    /// Bumped on every invalidation. A fetch only caches its result if the
    /// generation it started under is still current.
    generation: u64,
    /// Serializes fetches of this key so concurrent readers share one.
    gate: Arc<Mutex<()>>,
    loading: bool,
    error: Option<CoreError>,
}

/// Read cache shared by every typed operation.
///
/// Entries are keyed by [`QueryKey`] and type-erased; reading a key back
/// with a different type than it was stored under counts as a miss. Never
/// hold a map guard across an await point.
#[derive(Default)]
pub struct QueryClient {
    entries: DashMap<QueryKey, Entry>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Serve `key` from cache while fresh, otherwise run `fetcher` under the
    /// read's retry policy.
    ///
    /// Callers racing on the same key wait for the first fetch and then get
    /// its cached result. A fetch that straddles an invalidation still
    /// returns its result to its caller but does not cache it.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        opts: &QueryOptions,
        mut fetcher: F,
    ) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        if let Some(hit) = self.fresh::<T>(key, opts) {
            trace!(%key, "cache hit");
            return Ok(hit);
        }

        let gate = self.entries.entry(key.clone()).or_default().gate.clone();
        let _guard = gate.lock().await;

        if let Some(hit) = self.fresh::<T>(key, opts) {
            trace!(%key, "filled by concurrent fetch");
            return Ok(hit);
        }

        let generation = {
            let mut entry = self.entries.entry(key.clone()).or_default();
            entry.loading = true;
            entry.generation
        };
        let loading = LoadingFlag {
            entries: &self.entries,
            key,
        };
        debug!(%key, "fetching");

        let result = run_with_retry(opts.retry, &mut fetcher).await.map(Arc::new);
        drop(loading);

        let mut entry = self.entries.entry(key.clone()).or_default();
        match &result {
            Ok(data) => {
                entry.error = None;
                if entry.generation == generation {
                    let erased: Erased = data.clone();
                    entry.cached = Some(Cached {
                        data: erased,
                        fetched_at: Instant::now(),
                        stale: false,
                    });
                } else {
                    debug!(%key, "invalidated mid-fetch, result not cached");
                }
            }
            Err(e) => entry.error = Some(e.clone()),
        }
        result
    }

    /// [`fetch`](Self::fetch) reported as a [`QueryState`]. Disabled reads
    /// return [`QueryState::idle`] without touching the fetcher.
    pub async fn query<T, F, Fut>(
        &self,
        key: &QueryKey,
        opts: &QueryOptions,
        fetcher: F,
    ) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        if !opts.enabled {
            return QueryState::idle();
        }
        match self.fetch(key, opts, fetcher).await {
            Ok(data) => QueryState {
                data: Some(data),
                is_loading: false,
                error: None,
            },
            Err(error) => QueryState {
                data: self.cached(key),
                is_loading: false,
                error: Some(error),
            },
        }
    }

    /// Current state of `key` without any I/O. Data is returned even when
    /// stale.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        match self.entries.get(key) {
            Some(entry) => QueryState {
                data: entry
                    .cached
                    .as_ref()
                    .and_then(|c| c.data.clone().downcast::<T>().ok()),
                is_loading: entry.loading,
                error: entry.error.clone(),
            },
            None => QueryState::idle(),
        }
    }

    fn cached<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        let cached = entry.cached.as_ref()?;
        cached.data.clone().downcast::<T>().ok()
    }

    fn fresh<T: Send + Sync + 'static>(&self, key: &QueryKey, opts: &QueryOptions) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        let cached = entry.cached.as_ref()?;
        if cached.stale || cached.fetched_at.elapsed() >= opts.stale_time {
            return None;
        }
        cached.data.clone().downcast::<T>().ok()
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every key starting with `prefix` stale. Returns how many cached
    /// entries were affected.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut hit = 0;
        for mut entry in self.entries.iter_mut() {
            if !entry.key().starts_with(prefix) {
                continue;
            }
            entry.generation += 1;
            if let Some(cached) = entry.cached.as_mut() {
                cached.stale = true;
                hit += 1;
            }
        }
        debug!(%prefix, entries = hit, "invalidated");
        hit
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Run a write once. On success, `on_success` runs first and only then
    /// are the mutation's keys invalidated, so any read issued afterwards
    /// refetches.
    pub async fn mutate<T, Fut, S>(
        &self,
        mutation: &Mutation,
        work: Fut,
        on_success: S,
    ) -> Result<T, CoreError>
    where
        Fut: Future<Output = Result<T, CoreError>>,
        S: FnOnce(&T),
    {
        mutation.state.send_replace(MutationState {
            is_pending: true,
            error: None,
        });
        debug!(mutation = mutation.name, "running");

        match work.await {
            Ok(value) => {
                on_success(&value);
                for key in &mutation.invalidates {
                    self.invalidate(key);
                }
                mutation.state.send_replace(MutationState::default());
                Ok(value)
            }
            Err(e) => {
                debug!(mutation = mutation.name, error = %e, "failed");
                mutation.state.send_replace(MutationState {
                    is_pending: false,
                    error: Some(e.clone()),
                });
                Err(e)
            }
        }
    }
}

/// Clears an entry's `loading` flag when the fetch finishes or its future
/// is dropped mid-flight.
struct LoadingFlag<'a> {
    entries: &'a DashMap<QueryKey, Entry>,
    key: &'a QueryKey,
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        if let Some(mut entry) = self.entries.get_mut(self.key) {
            entry.loading = false;
        }
    }
}

async fn run_with_retry<T, F, Fut>(policy: RetryPolicy, fetcher: &mut F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let Some(delay) = policy.next_delay(attempt, &e) else {
                    return Err(e);
                };
                debug!(attempt = attempt + 1, ?delay, error = %e, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// ── Mutation ─────────────────────────────────────────────────────────

/// A write operation: never runs on its own, never retried, and names the
/// read keys its success makes stale.
pub struct Mutation {
    name: &'static str,
    invalidates: Vec<QueryKey>,
    state: watch::Sender<MutationState>,
}

impl Mutation {
    pub fn new(name: &'static str, invalidates: Vec<QueryKey>) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            name,
            invalidates,
            state,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }
}
