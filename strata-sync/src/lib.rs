//! # strata-sync: autosave and live reconciliation for layout editing
//!
//! Connects a [`strata_core::History`] to a host-provided field store.
//! Local edits are debounced and written as a versioned envelope; store
//! pushes are reconciled into the editor without echo loops.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  commands   ┌────────────────┐  set_value  ┌────────────┐
//! │ LayoutSession │ ──────────► │  session actor │ ──────────► │ FieldStore │
//! │   (handle)    │ ◄────────── │ history, save, │ ◄────────── │  (host)    │
//! └───────────────┘   events    │  reconciler    │    pushes   └────────────┘
//!                               └───────┬────────┘
//!                                       ▼
//!                                  ┌──────────┐
//!                                  │ Notifier │
//!                                  └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`]: field store seam plus an in-memory implementation
//! - [`notify`]: user-visible success and error notices
//! - [`schedule`]: cancellable debounce and backoff deadlines
//! - [`save`]: save status, retry policy, payload preparation
//! - [`reconcile`]: echo suppression and external change detection
//! - [`session`]: the actor tying it together

pub mod notify;
pub mod reconcile;
pub mod save;
pub mod schedule;
pub mod session;
pub mod store;

pub use notify::{LogNotifier, NoticeKind, Notifier, RecordingNotifier};
pub use reconcile::{ReconcileStats, Reconciler, Reconciliation};
pub use save::{
    prepare_payload, BackoffStrategy, RetryPolicy, SaveError, SaveState, SaveStatus, SaveTrigger,
};
pub use schedule::Deadline;
pub use session::{
    ChangeOrigin, LayoutSession, SessionConfig, SessionError, SessionEvent, SessionSnapshot,
};
pub use store::{FieldStore, MemoryFieldStore, MemoryStoreConfig, RawValue, StoreError};
