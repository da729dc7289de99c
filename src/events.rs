//! Cross-view change notifications.
//!
//! A successful mutation anywhere publishes an event; views that cache
//! derived data (the nav summary) subscribe and refresh. Emission is
//! fire-and-forget, and a subscriber only sees events sent after it
//! subscribed.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    TasksChanged,
    ProjectsChanged,
}

impl TaskEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::TasksChanged => "tasks_changed",
            TaskEvent::ProjectsChanged => "projects_changed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskEvents {
    sender: broadcast::Sender<TaskEvent>,
}

impl TaskEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers reached.
    pub fn publish(&self, event: TaskEvent) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("no subscribers for {}", event.event_type());
                0
            }
        }
    }

    pub fn subscribe(&self) -> TaskSubscription {
        TaskSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for TaskEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

pub struct TaskSubscription {
    receiver: broadcast::Receiver<TaskEvent>,
}

impl TaskSubscription {
    /// Waits for the next event. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Consumes everything queued; true when at least one event was pending.
    pub fn drain(&mut self) -> bool {
        let mut pending = false;
        loop {
            match self.receiver.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => pending = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let events = TaskEvents::new(8);
        let mut sub = events.subscribe();
        assert_eq!(events.publish(TaskEvent::TasksChanged), 1);
        assert_eq!(sub.recv().await, Some(TaskEvent::TasksChanged));
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let events = TaskEvents::default();
        assert_eq!(events.publish(TaskEvent::ProjectsChanged), 0);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let events = TaskEvents::new(8);
        let mut early = events.subscribe();
        events.publish(TaskEvent::TasksChanged);
        let mut late = events.subscribe();

        assert!(early.drain());
        assert!(!early.drain());
        assert!(!late.drain());
    }

    #[test]
    fn test_lagging_subscriber_still_sees_pending() {
        let events = TaskEvents::new(2);
        let mut sub = events.subscribe();
        for _ in 0..5 {
            events.publish(TaskEvent::TasksChanged);
        }
        assert!(sub.drain());
        assert!(!sub.drain());
    }
}
