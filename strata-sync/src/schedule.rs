//! Cancellable one-shot deadlines for the session's debounce and retry
//! timers.
//!
//! A [`Deadline`] is owned by the task that waits on it. Arming an armed
//! deadline moves it; cancelling drops the underlying sleep so nothing
//! fires afterwards.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

#[derive(Debug, Default)]
pub struct Deadline {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `after` from now, replacing any earlier schedule.
    pub fn arm(&mut self, after: Duration) {
        let at = Instant::now() + after;
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(at),
            None => self.sleep = Some(Box::pin(tokio::time::sleep_until(at))),
        }
    }

    /// Returns whether something was pending.
    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.sleep
            .as_ref()
            .map(|sleep| sleep.deadline().saturating_duration_since(Instant::now()))
    }

    /// Resolves when the deadline passes and disarms it. Never resolves
    /// while disarmed. Cancel-safe: dropping this future keeps the schedule.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => std::future::pending().await,
        }
    }
}
