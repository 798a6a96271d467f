//! User-visible feedback channel.

use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
            NoticeKind::Warning => "warning",
        })
    }
}

/// Surfaces short messages to the person editing.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Writes notices to the log. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => log::info!("[notice] {message}"),
            NoticeKind::Warning => log::warn!("[notice] {message}"),
            NoticeKind::Error => log::error!("[notice] {message}"),
        }
    }
}

/// Keeps every notice for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .map(|n| n.iter().filter(|(k, _)| *k == kind).count())
            .unwrap_or(0)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push((kind, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_counts() {
        let notifier = RecordingNotifier::new();
        notifier.notify(NoticeKind::Success, "saved");
        notifier.notify(NoticeKind::Error, "failed");
        notifier.notify(NoticeKind::Success, "saved again");
        assert_eq!(notifier.count(NoticeKind::Success), 2);
        assert_eq!(notifier.count(NoticeKind::Error), 1);
        assert_eq!(notifier.count(NoticeKind::Warning), 0);
        assert_eq!(notifier.notices()[1], (NoticeKind::Error, "failed".to_string()));
    }
}
