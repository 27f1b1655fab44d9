use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::booking::OwnerId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound plain-text channel to a booking owner.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, to: &OwnerId, body: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn deliver(&self, to: &OwnerId, body: &str) -> Result<(), NotifyError> {
        tracing::info!(event_name = "notify.logged", owner = %to, body, "notification");
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentNotification {
    pub to: OwnerId,
    pub body: String,
}

/// Keeps every delivered notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn sent_to(&self, owner: &OwnerId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|notification| &notification.to == owner)
            .map(|notification| notification.body)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, to: &OwnerId, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SentNotification { to: to.clone(), body: body.to_string() });
        Ok(())
    }
}
