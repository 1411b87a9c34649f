//! Transient user-facing messages ("toasts") raised by board operations.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ts_rs::TS;

pub const MSG_REORDERED: &str = "Réordonné";
pub const MSG_TASK_MOVED: &str = "Tâche déplacée";
pub const MSG_MOVE_FAILED: &str = "Erreur lors du déplacement";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// Sink for notifications. Delivery is best-effort.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fans notifications out to every live subscriber.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.sender.send(notification); // no listeners is fine
    }
}

/// Server-side sink: there is no one to show a toast to, so log it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => {
                tracing::debug!(text = %notification.message, "Notification")
            }
            NotificationLevel::Error => {
                tracing::warn!(text = %notification.message, "Notification")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();

        notifier.notify(Notification::success(MSG_TASK_MOVED));

        let received = rx.recv().await.unwrap();
        assert_eq!(received, Notification::success("Tâche déplacée"));
        assert!(!received.is_error());
    }

    #[test]
    fn notify_without_subscribers_is_silent() {
        BroadcastNotifier::new(1).notify(Notification::error(MSG_MOVE_FAILED));
    }
}
