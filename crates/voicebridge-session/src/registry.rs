//! Tracks live Supervisors for the idle reaper sweep and session-count
//! metrics. Creation itself stays with the caller (the telephony ingress
//! decides when a new call needs a Supervisor); the registry only holds
//! handles once they exist.

use crate::supervisor::SupervisorHandle;
use dashmap::DashMap;
use std::sync::Arc;
use voicebridge_core::SessionId;

#[derive(Default)]
pub struct SupervisorRegistry {
    sessions: DashMap<SessionId, Arc<SupervisorHandle>>,
}

impl SupervisorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: Arc<SupervisorHandle>) {
        self.sessions.insert(handle.session_id.clone(), handle);
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Arc<SupervisorHandle>> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    pub fn remove(&self, session_id: &SessionId) {
        self.sessions.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of all currently registered handles, for the reaper sweep.
    pub fn handles(&self) -> Vec<Arc<SupervisorHandle>> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }
}
