//! Transient user notifications ("toasts").
//!
//! Background failures and mutation results are published on a broadcast
//! bus; any number of front-end consumers subscribe independently. With no
//! subscribers a notification is dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use spacenote_core::{Error, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            code: None,
            at: Utc::now(),
        }
    }

    pub fn from_error(error: &Error) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: error.message(),
            code: Some(error.code()),
            at: Utc::now(),
        }
    }
}

/// Broadcast bus for [`Notification`]s.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, notification: Notification) {
        tracing::debug!(
            subsystem = "client",
            component = "notifications",
            level = ?notification.level,
            subscriber_count = self.tx.receiver_count(),
            "Notification published"
        );
        let _ = self.tx.send(notification);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notification::new(NotificationLevel::Success, message));
    }

    pub fn error(&self, error: &Error) {
        self.publish(Notification::from_error(error));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
