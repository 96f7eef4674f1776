//! Notification sinks.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{error, info, warn};

use catalog::{CatalogError, Notification, NotificationSink, Result, Severity};

/// Emits every notification as a tracing event at the matching level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn publish(&self, notification: Notification) -> Result<()> {
        match notification.severity {
            Severity::Info => info!("{}", notification.message),
            Severity::Warning => warn!("{}", notification.message),
            Severity::Error => error!("{}", notification.message),
        }
        Ok(())
    }
}

/// Keeps published notifications in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Notification> {
        match self.published.lock() {
            Ok(published) => published.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn publish(&self, notification: Notification) -> Result<()> {
        self.published
            .lock()
            .map_err(|_| CatalogError::Store("notification log is poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.publish(Notification::info("first")).await.unwrap();
        notifier.publish(Notification::info("second")).await.unwrap();

        let messages: Vec<String> = notifier.published().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
