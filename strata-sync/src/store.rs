//! Field store contract and an in-memory implementation.
//!
//! The field store is the external document field the editor persists to.
//! It owns the durable value, accepts asynchronous writes that may fail,
//! and pushes value changes to subscribers at any time (including, on
//! some backends, the session's own writes).
//!
//! [`MemoryFieldStore`] stands in for the real backend during development
//! and in tests: it can inject write failures, add latency, echo writes
//! back to subscribers and simulate edits made elsewhere.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// Untyped value as held by the store.
pub type RawValue = Value;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Field store rejected the write: {0}")]
    Rejected(String),
    #[error("Field store unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous document field.
///
/// Handles are passed explicitly to whoever needs them (`Arc<dyn FieldStore>`).
pub trait FieldStore: Send + Sync {
    /// Current persisted value, if any.
    fn get_value(&self) -> Option<RawValue>;

    /// Persist `value`. The returned future owns everything it needs.
    fn set_value(&self, value: RawValue) -> BoxFuture<'static, Result<(), StoreError>>;

    /// Subscribe to value changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<RawValue>;
}

/// In-memory store configuration.
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Delay applied to every write before it resolves.
    pub write_latency: Option<Duration>,
    /// Push successful writes back to subscribers, like backends that
    /// notify every change regardless of origin.
    pub echo_writes: bool,
    /// Push the written value to subscribers this long after the write
    /// starts, before it resolves. Replaces the echo on success.
    pub early_echo: Option<Duration>,
    /// Broadcast channel capacity for change notifications.
    pub channel_capacity: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            write_latency: None,
            echo_writes: false,
            early_echo: None,
            channel_capacity: 64,
        }
    }
}

struct MemoryInner {
    value: Mutex<Option<RawValue>>,
    /// Successful writes, oldest first.
    writes: Mutex<Vec<RawValue>>,
    changes: broadcast::Sender<RawValue>,
    config: MemoryStoreConfig,
    fail_next: AtomicU32,
    attempts: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Shared in-memory field store. Clones refer to the same field.
#[derive(Clone)]
pub struct MemoryFieldStore {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryFieldStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFieldStore {
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let (changes, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            inner: Arc::new(MemoryInner {
                value: Mutex::new(None),
                writes: Mutex::new(Vec::new()),
                changes,
                config,
                fail_next: AtomicU32::new(0),
                attempts: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Seed the stored value without notifying anyone.
    pub fn with_initial(self, value: RawValue) -> Self {
        *lock(&self.inner.value) = Some(value);
        self
    }

    /// Make the next `count` writes fail.
    pub fn fail_next(&self, count: u32) {
        self.inner.fail_next.store(count, Ordering::SeqCst);
    }

    /// Simulate an edit made outside this session: replace the value and
    /// notify subscribers.
    pub fn push_external(&self, value: RawValue) {
        *lock(&self.inner.value) = Some(value.clone());
        let _ = self.inner.changes.send(value);
    }

    pub fn value(&self) -> Option<RawValue> {
        lock(&self.inner.value).clone()
    }

    /// Successful writes, oldest first.
    pub fn writes(&self) -> Vec<RawValue> {
        lock(&self.inner.writes).clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.inner.writes).len()
    }

    /// Every write attempt, including failed ones.
    pub fn attempt_count(&self) -> u64 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of writes observed in flight at once.
    pub fn max_concurrent_writes(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }
}

impl FieldStore for MemoryFieldStore {
    fn get_value(&self) -> Option<RawValue> {
        self.value()
    }

    fn set_value(&self, value: RawValue) -> BoxFuture<'static, Result<(), StoreError>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.attempts.fetch_add(1, Ordering::SeqCst);
            let now = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            inner.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let latency = inner.config.write_latency.unwrap_or_default();
            match inner.config.early_echo {
                Some(early) => {
                    let early = early.min(latency);
                    tokio::time::sleep(early).await;
                    let _ = inner.changes.send(value.clone());
                    tokio::time::sleep(latency - early).await;
                }
                None if !latency.is_zero() => tokio::time::sleep(latency).await,
                None => {}
            }

            let fail = inner
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

            let result = if fail {
                Err(StoreError::Rejected("injected failure".to_string()))
            } else {
                *lock(&inner.value) = Some(value.clone());
                lock(&inner.writes).push(value.clone());
                if inner.config.echo_writes && inner.config.early_echo.is_none() {
                    let _ = inner.changes.send(value);
                }
                Ok(())
            };

            inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<RawValue> {
        self.inner.changes.subscribe()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
