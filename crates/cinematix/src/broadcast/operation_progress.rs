//! Operation progress broadcaster for presentation layers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::{OperationStatus, ProcessingStats};

/// Progress event for a remaster operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemasterEvent {
    /// Operation identifier.
    pub operation_id: Uuid,
    /// Name of the source file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Lifecycle status after this event.
    pub status: OperationStatus,
    /// Progress after this event, 0-100.
    pub progress: u8,
    /// Human-readable description of the current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Analysis stats (set once analysis succeeded or defaults were applied).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ProcessingStats>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Broadcasts operation events to every subscriber.
#[derive(Clone)]
pub struct RemasterBroadcaster {
    sender: Arc<broadcast::Sender<RemasterEvent>>,
}

impl RemasterBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: RemasterEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RemasterEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker for one operation.
    pub fn start_operation(&self, operation_id: Uuid, filename: Option<&str>) -> OperationTracker {
        OperationTracker {
            operation_id,
            filename: filename.map(|f| f.to_string()),
            broadcaster: self.clone(),
        }
    }
}

impl Default for RemasterBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Emits events on behalf of a single operation.
pub struct OperationTracker {
    operation_id: Uuid,
    filename: Option<String>,
    broadcaster: RemasterBroadcaster,
}

impl OperationTracker {
    fn event(&self, status: OperationStatus, progress: u8, message: &str) -> RemasterEvent {
        RemasterEvent {
            operation_id: self.operation_id,
            filename: self.filename.clone(),
            status,
            progress,
            message: message.to_string(),
            timestamp: Utc::now(),
            stats: None,
            error: None,
        }
    }

    pub fn update(&self, status: OperationStatus, progress: u8, message: &str) {
        self.broadcaster.send(self.event(status, progress, message));
    }

    pub fn analyzed(&self, progress: u8, stats: &ProcessingStats) {
        let mut event = self.event(OperationStatus::Analyzing, progress, "Frame analyzed");
        event.stats = Some(stats.clone());
        self.broadcaster.send(event);
    }

    pub fn completed(&self, stats: Option<&ProcessingStats>) {
        let mut event = self.event(OperationStatus::Completed, 100, "Remaster completed");
        event.stats = stats.cloned();
        self.broadcaster.send(event);
    }

    pub fn failed(&self, progress: u8, error: &str) {
        let mut event = self.event(OperationStatus::Error, progress, "Remaster failed");
        event.error = Some(error.to_string());
        self.broadcaster.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = RemasterBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let id = Uuid::new_v4();
        let tracker = broadcaster.start_operation(id, Some("reel.mp4"));
        tracker.update(OperationStatus::Analyzing, 10, "Sampling frame");

        let received = rx.try_recv().unwrap();
        assert_eq!(received.operation_id, id);
        assert_eq!(received.filename.as_deref(), Some("reel.mp4"));
        assert_eq!(received.status, OperationStatus::Analyzing);
        assert_eq!(received.progress, 10);
        assert_eq!(received.message, "Sampling frame");
    }

    #[test]
    fn test_completion_carries_stats() {
        let broadcaster = RemasterBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        let tracker = broadcaster.start_operation(Uuid::new_v4(), None);
        let stats = ProcessingStats {
            noise_level: 92,
            estimated_resolution: "4K Neural Analysis".to_string(),
            dynamic_range: "restoring color".to_string(),
            frame_health: 30,
        };
        tracker.completed(Some(&stats));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.status, OperationStatus::Completed);
        assert_eq!(received.progress, 100);
        assert_eq!(received.stats, Some(stats));
    }

    #[test]
    fn test_failure_event() {
        let broadcaster = RemasterBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let tracker = broadcaster.start_operation(Uuid::new_v4(), None);
        tracker.failed(10, "Analysis service returned 429: quota");

        let received = rx.try_recv().unwrap();
        assert_eq!(received.status, OperationStatus::Error);
        assert_eq!(
            received.error.as_deref(),
            Some("Analysis service returned 429: quota")
        );

        let json = serde_json::to_value(&received).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("stats").is_none());
    }

    #[test]
    fn test_trackers_share_the_channel() {
        let broadcaster = RemasterBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let first = broadcaster.start_operation(Uuid::new_v4(), Some("a.mp4"));
        let second = broadcaster.clone().start_operation(Uuid::new_v4(), Some("b.mp4"));
        first.update(OperationStatus::Analyzing, 10, "Sampling frame");
        second.failed(0, "stale");

        assert_eq!(rx.try_recv().unwrap().filename.as_deref(), Some("a.mp4"));
        assert_eq!(rx.try_recv().unwrap().filename.as_deref(), Some("b.mp4"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_without_subscribers() {
        let broadcaster = RemasterBroadcaster::new(10);
        let tracker = broadcaster.start_operation(Uuid::new_v4(), None);
        tracker.update(OperationStatus::Processing, 35, "Remastering");
    }
}
