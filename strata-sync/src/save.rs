//! Autosave bookkeeping: status, retry policy and payload preparation.
//!
//! State machine for one save cycle:
//! ```text
//!          edit                 timer / manual
//!   Idle ────────► Debouncing ─────────────────► Saving ──ok──► Idle
//!    ▲                                             │
//!    │                                           error
//!    │                                             ▼
//!    │   attempts exhausted              attempts < max
//!    └──── Failed ◄──────────────────── (backoff) Retrying ──► Saving
//! ```

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use strata_core::{validate_value, EnvelopeError, Layout, SaveEnvelope, SchemaViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Debouncing,
    Saving,
    Retrying,
    Failed,
}

/// Why a write was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SaveTrigger {
    /// Debounce timer after local edits.
    Auto,
    /// Backoff timer after a failed attempt.
    Retry,
    /// Explicit "save now".
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// `attempt × base`
    Linear,
    /// `base × 2^(attempt - 1)`
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total write attempts per cycle, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            strategy: BackoffStrategy::Linear,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt number `attempt`
    /// (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.strategy {
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    pub fn should_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }
}

/// A save that cannot succeed by retrying.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    Encode(#[from] EnvelopeError),
    #[error("Layout does not match the envelope schema: {}", join(.0))]
    Schema(Vec<SchemaViolation>),
}

fn join(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Wrap `layout` in a freshly stamped envelope and check it against the
/// schema before it is handed to the store.
pub fn prepare_payload(layout: &Layout) -> Result<Value, SaveError> {
    let value = SaveEnvelope::stamped_now(layout.clone()).to_value()?;
    let violations = validate_value(&value);
    if !violations.is_empty() {
        return Err(SaveError::Schema(violations));
    }
    Ok(value)
}

/// Process-local save state, owned by the session actor.
#[derive(Debug, Clone)]
pub struct SaveState {
    pub status: SaveStatus,
    /// Canonical component list the store is known to hold.
    pub last_written: Option<String>,
    /// Failed attempts in the current cycle.
    pub attempts: u32,
    /// Save requested while a write was in flight.
    pub pending: Option<SaveTrigger>,
}

impl SaveState {
    pub fn new(last_written: Option<String>) -> Self {
        Self {
            status: SaveStatus::Idle,
            last_written,
            attempts: 0,
            pending: None,
        }
    }

    /// Queue a follow-up save; a manual request outranks an automatic one.
    pub fn queue(&mut self, trigger: SaveTrigger) {
        self.pending = Some(match self.pending {
            Some(existing) => existing.max(trigger),
            None => trigger,
        });
    }

    pub fn record_success(&mut self, canonical: String) {
        self.last_written = Some(canonical);
        self.attempts = 0;
        self.status = SaveStatus::Idle;
    }

    /// Terminal failure: counters reset, status stays visible as `Failed`.
    pub fn record_failure(&mut self) {
        self.attempts = 0;
        self.pending = None;
        self.status = SaveStatus::Failed;
    }

    pub fn matches_last_written(&self, canonical: &str) -> bool {
        self.last_written.as_deref() == Some(canonical)
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Debouncing => "debouncing",
            SaveStatus::Saving => "saving",
            SaveStatus::Retrying => "retrying",
            SaveStatus::Failed => "failed",
        })
    }
}
