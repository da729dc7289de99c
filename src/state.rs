use std::sync::Arc;

use crate::events::TaskEvents;
use crate::services::{ProjectService, TaskService};
use crate::session::{AuthProvider, OfflineAuth, SessionManager, SessionMode};
use crate::store::{MemoryStore, TaskStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub sessions: SessionManager,
    pub events: TaskEvents,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, sessions: SessionManager, events: TaskEvents) -> Self {
        Self {
            store,
            sessions,
            events,
        }
    }

    /// Memory store with local anonymous sessions.
    pub fn offline(store: Arc<MemoryStore>) -> Self {
        let auth: Arc<dyn AuthProvider> = Arc::new(OfflineAuth);
        Self::new(
            store,
            SessionManager::new(auth, SessionMode::Anonymous),
            TaskEvents::default(),
        )
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(Arc::clone(&self.store), self.events.clone())
    }

    pub fn projects(&self) -> ProjectService {
        ProjectService::new(Arc::clone(&self.store), self.events.clone())
    }
}
