//! Keyed query cache with request coalescing, invalidation and polling.
//!
//! # Design
//! - Each key owns a slot holding the last confirmed value, a staleness flag
//!   and an async fetch lock, so at most one request per key is in flight.
//! - Callers that queue behind a running request reuse its result when it
//!   succeeded and nothing invalidated the key meanwhile; after a failure
//!   each waiter runs its own request.
//! - Invalidation is by key prefix. It marks slots stale and wakes their
//!   pollers; values are never patched locally.
//! - A [`QueryWatch`] owns its polling task and aborts it on drop.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Refetch interval of the status, progress and backup list views.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Ordered key segments identifying one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Key made of the given segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// `["status"]`
    #[must_use]
    pub fn status() -> Self {
        Self::new(["status"])
    }

    /// `["progress"]`
    #[must_use]
    pub fn progress() -> Self {
        Self::new(["progress"])
    }

    /// `["backups"]`
    #[must_use]
    pub fn backups_clients() -> Self {
        Self::new(["backups"])
    }

    /// `["backups", clientid]`
    #[must_use]
    pub fn client_backups(clientid: i64) -> Self {
        Self::new(["backups".to_string(), clientid.to_string()])
    }

    /// `["backups", clientid, backupid, path segments...]`
    #[must_use]
    pub fn backup_files(clientid: i64, backupid: i64, path: &str) -> Self {
        let mut key = Self::client_backups(clientid);
        key.0.push(backupid.to_string());
        key.0.extend(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );
        key
    }

    /// `["storage-usage"]`
    #[must_use]
    pub fn storage_usage() -> Self {
        Self::new(["storage-usage"])
    }

    /// `["client-storage-usage"]`
    #[must_use]
    pub fn client_storage_usage() -> Self {
        Self::new(["client-storage-usage"])
    }

    /// `["usage-graph"]`, the prefix of every usage history key.
    #[must_use]
    pub fn usage_graph_all() -> Self {
        Self::new(["usage-graph"])
    }

    /// `["usage-graph", scale, clientid?]`
    #[must_use]
    pub fn usage_graph(scale: &str, clientid: Option<i64>) -> Self {
        let mut key = Self::new(["usage-graph", scale]);
        if let Some(id) = clientid {
            key.0.push(id.to_string());
        }
        key
    }

    /// `["users"]`
    #[must_use]
    pub fn users() -> Self {
        Self::new(["users"])
    }

    /// Key segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True when `prefix` matches the leading segments of this key.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl Display for QueryKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0.join("/"))
    }
}

/// Per-query fetch behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Poll interval for watched queries; `None` refetches only on invalidation.
    pub refetch_interval: Option<Duration>,
    /// Extra attempts after a retryable failure.
    pub retry: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            refetch_interval: None,
            retry: 1,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl QueryOptions {
    /// Options that poll every `interval`.
    #[must_use]
    pub fn polling(interval: Duration) -> Self {
        Self {
            refetch_interval: Some(interval),
            ..Self::default()
        }
    }

    /// Override the retry count.
    #[must_use]
    pub const fn with_retry(mut self, retry: u32, delay: Duration) -> Self {
        self.retry = retry;
        self.retry_delay = delay;
        self
    }
}

/// Latest outcome of a watched query.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    /// Last successfully fetched value; kept across later failures.
    pub data: Option<T>,
    /// Detail of the most recent failure, cleared on success.
    pub error: Option<String>,
    /// Set when the most recent failure means the session expired.
    pub requires_login: bool,
    /// Completed fetch attempts.
    pub fetch_count: u64,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            requires_login: false,
            fetch_count: 0,
        }
    }
}

impl<T> QueryState<T> {
    fn apply(&mut self, result: ApiResult<T>) {
        self.fetch_count += 1;
        match result {
            Ok(value) => {
                self.data = Some(value);
                self.error = None;
                self.requires_login = false;
            }
            Err(err) => {
                self.requires_login = err.requires_login();
                self.error = Some(err.detail());
            }
        }
    }
}

/// Handle to a polling query. Dropping it stops the poller.
#[derive(Debug)]
pub struct QueryWatch<T> {
    receiver: watch::Receiver<QueryState<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> QueryWatch<T> {
    /// Snapshot of the latest state.
    #[must_use]
    pub fn current(&self) -> QueryState<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next state update. Returns `None` once the poller stopped.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Additional receiver for the state updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.receiver.clone()
    }
}

impl<T> Drop for QueryWatch<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

type CachedValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct SlotState {
    value: Option<CachedValue>,
    stale: bool,
    completed: u64,
    epoch: u64,
}

struct Slot {
    fetch_lock: AsyncMutex<()>,
    state: Mutex<SlotState>,
    invalidations: watch::Sender<u64>,
}

impl Slot {
    fn new() -> Self {
        let (invalidations, _) = watch::channel(0);
        Self {
            fetch_lock: AsyncMutex::new(()),
            state: Mutex::new(SlotState::default()),
            invalidations,
        }
    }

    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn value<T: Clone + 'static>(&self) -> Option<T> {
        self.state()
            .value
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>().cloned())
    }

    fn coalesced<T: Clone + 'static>(&self, seen: u64) -> Option<T> {
        let state = self.state();
        if state.completed > seen && !state.stale {
            state
                .value
                .as_ref()
                .and_then(|value| value.downcast_ref::<T>().cloned())
        } else {
            None
        }
    }

    fn store(&self, value: CachedValue, epoch: u64) {
        let mut state = self.state();
        state.value = Some(value);
        state.completed += 1;
        state.stale = state.epoch != epoch;
    }

    fn mark_stale(&self) {
        {
            let mut state = self.state();
            state.stale = true;
            state.epoch += 1;
        }
        self.invalidations.send_modify(|count| *count += 1);
    }
}

/// Shared cache of query results keyed by [`QueryKey`].
#[derive(Clone, Default)]
pub struct QueryClient {
    slots: Arc<Mutex<HashMap<QueryKey, Arc<Slot>>>>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QueryClient")
            .field("keys", &self.lock_slots().len())
            .finish()
    }
}

impl QueryClient {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<QueryKey, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &QueryKey) -> Arc<Slot> {
        Arc::clone(
            self.lock_slots()
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::new())),
        )
    }

    fn existing_slot(&self, key: &QueryKey) -> Option<Arc<Slot>> {
        self.lock_slots().get(key).map(Arc::clone)
    }

    /// Fetch `key` with default options.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error after the retry budget is spent.
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> ApiResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.fetch_with(key, QueryOptions::default(), fetcher).await
    }

    /// Fetch `key`, joining a request already in flight for the same key.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error after the retry budget is spent.
    pub async fn fetch_with<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> ApiResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let slot = self.slot(key);
        let seen = slot.state().completed;
        let _in_flight = slot.fetch_lock.lock().await;

        if let Some(value) = slot.coalesced::<T>(seen) {
            debug!(query_key = %key, "joined in-flight query");
            return Ok(value);
        }

        let epoch = slot.state().epoch;
        let result = run_with_retry(key, options, &fetcher).await;
        if let Ok(value) = &result {
            slot.store(Arc::new(value.clone()), epoch);
            debug!(query_key = %key, "query refreshed");
        }
        result
    }

    /// Last confirmed value for `key`, stale or not.
    #[must_use]
    pub fn cached<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.existing_slot(key)?.value::<T>()
    }

    /// True when `key` has been invalidated since its last successful fetch.
    #[must_use]
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.existing_slot(key)
            .is_some_and(|slot| slot.state().stale)
    }

    /// Mark every key starting with `prefix` stale and wake its pollers.
    ///
    /// Returns how many keys matched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let matching: Vec<Arc<Slot>> = self
            .lock_slots()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        for slot in &matching {
            slot.mark_stale();
        }
        debug!(prefix = %prefix, matched = matching.len(), "queries invalidated");
        matching.len()
    }

    /// Poll `key` in a background task, publishing each outcome.
    ///
    /// The first fetch starts immediately. Later fetches run every
    /// `refetch_interval` and right after any invalidation of the key.
    pub fn watch<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> QueryWatch<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(QueryState::default());
        let mut invalidations = self.slot(&key).invalidations.subscribe();
        let client = self.clone();

        let task = tokio::spawn(async move {
            loop {
                invalidations.mark_unchanged();
                let result = client.fetch_with(&key, options, &fetcher).await;
                sender.send_modify(|state| state.apply(result));

                if let Some(interval) = options.refetch_interval {
                    tokio::select! {
                        () = tokio::time::sleep(interval) => {}
                        changed = invalidations.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                } else if invalidations.changed().await.is_err() {
                    break;
                }
            }
        });

        QueryWatch { receiver, task }
    }
}

async fn run_with_retry<T, F, Fut>(
    key: &QueryKey,
    options: QueryOptions,
    fetcher: &F,
) -> ApiResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < options.retry && err.is_retryable() => {
                attempt += 1;
                warn!(query_key = %key, attempt, error = %err.detail(), "retrying query");
                tokio::time::sleep(options.retry_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
