//! Editor session: one actor task that owns the layout history, the
//! autosave state machine and the field store subscription.
//!
//! Architecture:
//! ```text
//!  LayoutSession ──commands──► SessionActor ──set_value──► FieldStore
//!        ▲                      │   ▲    ▲                     │
//!        └──── SessionEvent ────┘   │    └────── push ─────────┘
//!                                   │
//!                     debounce / backoff Deadlines
//! ```
//!
//! Everything is driven by discrete events (command, timer, push, write
//! completion) multiplexed in a single `select!` loop, so no two of them
//! ever mutate state concurrently. At most one store write is in flight.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use strata_core::{
    canonical_components, normalize, ComponentType, DropEvent, History, Layout, LayoutError,
    PlacedComponent,
};

use crate::notify::{NoticeKind, Notifier};
use crate::reconcile::{ReconcileStats, Reconciler, Reconciliation};
use crate::save::{prepare_payload, RetryPolicy, SaveState, SaveStatus, SaveTrigger};
use crate::schedule::Deadline;
use crate::store::{FieldStore, RawValue, StoreError};

const SAVED_MESSAGE: &str = "Layout saved successfully!";

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after the last edit before an autosave starts.
    pub debounce: Duration,
    pub retry: RetryPolicy,
    /// Command channel capacity.
    pub command_capacity: usize,
    /// Event channel capacity. Events are dropped when the consumer lags.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            retry: RetryPolicy::default(),
            command_capacity: 64,
            event_capacity: 256,
        }
    }
}

impl SessionConfig {
    /// Short timers for tests.
    pub fn for_testing() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            retry: RetryPolicy {
                base_delay: Duration::from_millis(100),
                ..RetryPolicy::default()
            },
            command_capacity: 16,
            event_capacity: 1024,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Layout session is closed")]
    Closed,
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// What caused the current layout to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Edit,
    Undo,
    Redo,
    External,
}

/// Events emitted by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LayoutChanged { origin: ChangeOrigin, layout: Layout },
    SaveStarted { trigger: SaveTrigger, attempt: u32 },
    Saved { components: usize },
    RetryScheduled { attempt: u32, delay: Duration },
    SaveFailed { reason: String },
    /// A push that merely reflected this session's own write.
    EchoSuppressed,
    /// A push that could not be parsed.
    PushRejected { reason: String },
}

/// Point-in-time view of the session state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub history: History,
    pub status: SaveStatus,
    pub attempts: u32,
    pub last_written: Option<String>,
    pub debounce_pending: bool,
    pub retry_pending: bool,
    pub reconcile: ReconcileStats,
}

#[derive(Debug)]
enum EditOp {
    Set(Layout),
    Insert { index: usize, component: PlacedComponent },
    Append(ComponentType),
    Move { from: usize, to: usize },
    Remove(String),
    Drop(DropEvent),
    Undo,
    Redo,
}

enum Command {
    Edit {
        op: EditOp,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    SaveNow {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running editor session.
///
/// Dropping the handle tears the session down the same way
/// [`shutdown`](Self::shutdown) does, without waiting for it.
pub struct LayoutSession {
    commands: mpsc::Sender<Command>,
    event_rx: Option<mpsc::Receiver<SessionEvent>>,
    task: Option<JoinHandle<()>>,
}

impl LayoutSession {
    /// Load the stored layout, subscribe to store pushes and start the
    /// session actor. Must be called from within a tokio runtime.
    pub fn spawn(
        store: Arc<dyn FieldStore>,
        notifier: Arc<dyn Notifier>,
        config: SessionConfig,
    ) -> Self {
        let (history, last_written) = load_initial(store.as_ref());
        let subscription = store.subscribe();
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));

        let actor = SessionActor {
            history,
            save: SaveState::new(last_written),
            reconciler: Reconciler::new(),
            store,
            notifier,
            config,
            events: event_tx,
            debounce: Deadline::new(),
            backoff: Deadline::new(),
            in_flight: None,
            subscription: Some(subscription),
        };
        let task = tokio::spawn(actor.run(command_rx));

        Self {
            commands: command_tx,
            event_rx: Some(event_rx),
            task: Some(task),
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.event_rx.take()
    }

    pub async fn set_layout(&self, layout: Layout) -> Result<bool, SessionError> {
        self.edit(EditOp::Set(layout)).await
    }

    pub async fn insert_at(
        &self,
        index: usize,
        component: PlacedComponent,
    ) -> Result<bool, SessionError> {
        self.edit(EditOp::Insert { index, component }).await
    }

    /// Add a new component of `kind` at the end of the layout.
    pub async fn append(&self, kind: ComponentType) -> Result<bool, SessionError> {
        self.edit(EditOp::Append(kind)).await
    }

    pub async fn move_at(&self, from: usize, to: usize) -> Result<bool, SessionError> {
        self.edit(EditOp::Move { from, to }).await
    }

    pub async fn remove_component(&self, id: impl Into<String>) -> Result<bool, SessionError> {
        self.edit(EditOp::Remove(id.into())).await
    }

    pub async fn apply_drop(&self, drop: DropEvent) -> Result<bool, SessionError> {
        self.edit(EditOp::Drop(drop)).await
    }

    /// Returns `false` if there was nothing to undo.
    pub async fn undo(&self) -> Result<bool, SessionError> {
        self.edit(EditOp::Undo).await
    }

    /// Returns `false` if there was nothing to redo.
    pub async fn redo(&self) -> Result<bool, SessionError> {
        self.edit(EditOp::Redo).await
    }

    /// Save immediately, skipping the debounce.
    pub async fn save_now(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SaveNow { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Cancel pending timers, let an in-flight write settle and stop.
    pub async fn shutdown(mut self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)?;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    async fn edit(&self, op: EditOp) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Edit { op, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

fn load_initial(store: &dyn FieldStore) -> (History, Option<String>) {
    let Some(raw) = store.get_value() else {
        return (History::default(), None);
    };
    match normalize(&raw) {
        Ok(Some(payload)) => {
            log::info!(
                "Loaded layout with {} components ({})",
                payload.layout.len(),
                payload.format
            );
            let canonical = canonical_components(&payload.layout);
            (History::new(payload.layout), Some(canonical))
        }
        Ok(None) => (History::default(), None),
        Err(e) => {
            log::error!("Failed to parse initial layout value: {e}");
            (History::default(), None)
        }
    }
}

struct InFlight {
    future: BoxFuture<'static, Result<(), StoreError>>,
    /// Canonical component list being written.
    canonical: String,
    components: usize,
}

struct SessionActor {
    history: History,
    save: SaveState,
    reconciler: Reconciler,
    store: Arc<dyn FieldStore>,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    events: mpsc::Sender<SessionEvent>,
    debounce: Deadline,
    backoff: Deadline,
    in_flight: Option<InFlight>,
    subscription: Option<broadcast::Receiver<RawValue>>,
}

enum Push {
    Value(RawValue),
    Lagged(u64),
    Closed,
}

async fn write_settled(in_flight: &mut Option<InFlight>) -> Result<(), StoreError> {
    match in_flight {
        Some(flight) => (&mut flight.future).await,
        None => std::future::pending().await,
    }
}

async fn next_push(subscription: &mut Option<broadcast::Receiver<RawValue>>) -> Push {
    let Some(rx) = subscription else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(value) => Push::Value(value),
        Err(RecvError::Lagged(skipped)) => Push::Lagged(skipped),
        Err(RecvError::Closed) => Push::Closed,
    }
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        log::info!(
            "Layout session started with {} components",
            self.history.current().len()
        );
        loop {
            tokio::select! {
                biased;

                result = write_settled(&mut self.in_flight) => self.on_write_settled(result),

                command = commands.recv() => {
                    let Some(command) = command else {
                        self.teardown().await;
                        return;
                    };
                    if let Some(reply) = self.handle_command(command) {
                        self.teardown().await;
                        let _ = reply.send(());
                        return;
                    }
                }

                push = next_push(&mut self.subscription) => self.on_push(push),

                _ = self.debounce.fired() => self.on_debounce_fired(),

                _ = self.backoff.fired() => self.start_save(SaveTrigger::Retry),
            }
        }
    }

    /// Returns the reply channel when the command asks the session to stop.
    fn handle_command(&mut self, command: Command) -> Option<oneshot::Sender<()>> {
        match command {
            Command::Edit { op, reply } => {
                let result = self.apply_edit(op);
                let _ = reply.send(result);
            }
            Command::SaveNow { reply } => {
                self.request_manual_save();
                let _ = reply.send(());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { reply } => return Some(reply),
        }
        None
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            history: self.history.clone(),
            status: self.save.status,
            attempts: self.save.attempts,
            last_written: self.save.last_written.clone(),
            debounce_pending: self.debounce.is_armed(),
            retry_pending: self.backoff.is_armed(),
            reconcile: self.reconciler.stats().clone(),
        }
    }

    // ── Edits ───────────────────────────────────────────────────────

    fn apply_edit(&mut self, op: EditOp) -> Result<bool, SessionError> {
        let origin = match op {
            EditOp::Undo => ChangeOrigin::Undo,
            EditOp::Redo => ChangeOrigin::Redo,
            _ => ChangeOrigin::Edit,
        };
        let changed = match op {
            EditOp::Set(layout) => {
                self.history.set_layout(layout);
                true
            }
            EditOp::Insert { index, component } => {
                self.history.insert_at(index, component)?;
                true
            }
            EditOp::Append(kind) => {
                self.history.append(kind)?;
                true
            }
            EditOp::Move { from, to } => self.history.move_at(from, to),
            EditOp::Remove(id) => {
                self.history.remove_component(&id);
                true
            }
            EditOp::Drop(drop) => self.history.apply_drop(&drop)?,
            EditOp::Undo => self.history.undo(),
            EditOp::Redo => self.history.redo(),
        };
        if changed {
            self.emit(SessionEvent::LayoutChanged {
                origin,
                layout: self.history.current().clone(),
            });
            self.schedule_autosave();
        }
        Ok(changed)
    }

    // ── Autosave ────────────────────────────────────────────────────

    /// A local change restarts the debounce. A pending retry or a failed
    /// cycle is superseded by the newer layout and starts over.
    fn schedule_autosave(&mut self) {
        if self.backoff.cancel() || self.save.status == SaveStatus::Failed {
            self.save.attempts = 0;
        }
        self.debounce.arm(self.config.debounce);
        if self.in_flight.is_none() {
            self.save.status = SaveStatus::Debouncing;
        }
    }

    fn on_debounce_fired(&mut self) {
        if self.in_flight.is_some() {
            log::debug!("Debounce fired during a write, queueing follow-up save");
            self.save.queue(SaveTrigger::Auto);
            return;
        }
        self.autosave_if_changed();
    }

    fn autosave_if_changed(&mut self) {
        let canonical = canonical_components(self.history.current());
        if self.save.matches_last_written(&canonical) {
            log::debug!("Layout unchanged since last write, skipping autosave");
            self.save.status = SaveStatus::Idle;
            return;
        }
        self.start_save(SaveTrigger::Auto);
    }

    fn request_manual_save(&mut self) {
        self.debounce.cancel();
        self.backoff.cancel();
        self.save.attempts = 0;
        if self.in_flight.is_some() {
            log::debug!("Manual save requested during a write, queueing");
            self.save.queue(SaveTrigger::Manual);
            return;
        }
        self.start_save(SaveTrigger::Manual);
    }

    fn start_save(&mut self, trigger: SaveTrigger) {
        debug_assert!(self.in_flight.is_none());
        let layout = self.history.current();
        let payload = match prepare_payload(layout) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Layout cannot be saved: {e}");
                self.notifier
                    .notify(NoticeKind::Error, &format!("Layout could not be saved: {e}"));
                self.save.record_failure();
                self.emit(SessionEvent::SaveFailed {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let attempt = self.save.attempts + 1;
        log::info!(
            "Saving layout ({} components, {:?}, attempt {}/{})",
            layout.len(),
            trigger,
            attempt,
            self.config.retry.max_attempts
        );
        let flight = InFlight {
            canonical: canonical_components(layout),
            components: layout.len(),
            future: self.store.set_value(payload),
        };
        self.in_flight = Some(flight);
        self.save.status = SaveStatus::Saving;
        self.emit(SessionEvent::SaveStarted { trigger, attempt });
    }

    fn on_write_settled(&mut self, result: Result<(), StoreError>) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        match result {
            Ok(()) => {
                log::info!("Layout saved ({} components)", flight.components);
                self.save.record_success(flight.canonical);
                self.notifier.notify(NoticeKind::Success, SAVED_MESSAGE);
                self.emit(SessionEvent::Saved {
                    components: flight.components,
                });
                if let Some(trigger) = self.save.pending.take() {
                    self.run_follow_up(trigger);
                } else if self.debounce.is_armed() {
                    self.save.status = SaveStatus::Debouncing;
                }
            }
            Err(e) => self.on_write_failed(e),
        }
    }

    fn on_write_failed(&mut self, error: StoreError) {
        self.save.attempts += 1;
        let attempts = self.save.attempts;
        let max = self.config.retry.max_attempts;
        log::warn!("Failed to save layout (attempt {attempts}/{max}): {error}");

        if let Some(trigger) = self.save.pending.take() {
            // A newer request supersedes this cycle.
            self.save.attempts = 0;
            self.run_follow_up(trigger);
            return;
        }
        if self.debounce.is_armed() {
            self.save.attempts = 0;
            self.save.status = SaveStatus::Debouncing;
            return;
        }
        if self.config.retry.should_retry(attempts) {
            let delay = self.config.retry.delay_for(attempts);
            log::info!("Retrying save in {delay:?} (attempt {}/{max})", attempts + 1);
            self.backoff.arm(delay);
            self.save.status = SaveStatus::Retrying;
            self.emit(SessionEvent::RetryScheduled {
                attempt: attempts + 1,
                delay,
            });
            return;
        }

        log::error!("Giving up on saving layout after {max} attempts: {error}");
        self.notifier.notify(
            NoticeKind::Error,
            &format!("Failed to save layout after {max} attempts. Please try again."),
        );
        self.save.record_failure();
        self.emit(SessionEvent::SaveFailed {
            reason: error.to_string(),
        });
    }

    fn run_follow_up(&mut self, trigger: SaveTrigger) {
        match trigger {
            SaveTrigger::Manual => {
                self.debounce.cancel();
                self.start_save(SaveTrigger::Manual);
            }
            // A pending debounce will pick up the latest layout itself.
            _ if self.debounce.is_armed() => self.save.status = SaveStatus::Debouncing,
            _ => self.autosave_if_changed(),
        }
    }

    // ── External changes ────────────────────────────────────────────

    fn on_push(&mut self, push: Push) {
        let raw = match push {
            Push::Value(raw) => raw,
            Push::Lagged(skipped) => {
                log::warn!("Missed {skipped} field store notifications");
                return;
            }
            Push::Closed => {
                log::info!("Field store subscription closed");
                self.subscription = None;
                return;
            }
        };

        let outcome = self.reconciler.reconcile(
            &raw,
            self.save.last_written.as_deref(),
            self.in_flight.as_ref().map(|flight| flight.canonical.as_str()),
            self.history.current(),
        );
        match outcome {
            Reconciliation::Apply {
                layout,
                canonical,
                format,
            } => {
                log::info!(
                    "Layout updated from external change ({} components, {format})",
                    layout.len()
                );
                self.history.set_layout(layout);
                self.save.last_written = Some(canonical);
                self.backoff.cancel();
                self.save.attempts = 0;
                if self.in_flight.is_some() {
                    // Our write may land after this change; write the
                    // current layout again once it settles.
                    self.save.queue(SaveTrigger::Auto);
                } else if !self.debounce.is_armed() {
                    self.save.status = SaveStatus::Idle;
                }
                self.emit(SessionEvent::LayoutChanged {
                    origin: ChangeOrigin::External,
                    layout: self.history.current().clone(),
                });
            }
            Reconciliation::Echo => {
                log::debug!("Ignoring echo of our own write");
                self.emit(SessionEvent::EchoSuppressed);
            }
            Reconciliation::Unchanged { canonical } => {
                log::debug!("External value matches the current layout");
                self.save.last_written = Some(canonical);
            }
            Reconciliation::Ignored => {
                log::debug!("Ignoring empty field value");
            }
            Reconciliation::Rejected(e) => {
                log::warn!("Discarding malformed layout update: {e}");
                self.emit(SessionEvent::PushRejected {
                    reason: e.to_string(),
                });
            }
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    async fn teardown(&mut self) {
        self.debounce.cancel();
        self.backoff.cancel();
        self.subscription = None;
        if let Some(flight) = self.in_flight.take() {
            match flight.future.await {
                Ok(()) => {
                    log::info!("In-flight save completed during shutdown");
                    self.save.record_success(flight.canonical);
                }
                Err(e) => log::warn!("In-flight save failed during shutdown: {e}"),
            }
        }
        log::info!("Layout session closed");
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.events.try_send(event) {
            log::trace!("Event channel full, dropping {event:?}");
        }
    }
}
