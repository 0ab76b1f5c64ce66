//! Process-wide table of live per-session meters.

use crate::meter::MeterState;
use crate::report::CostReport;
use dashmap::DashMap;
use tracing::debug;
use voicebridge_core::{Error, RateCard, Result, SessionId};

/// Holds one [`MeterState`] per active call. Ending a session computes its
/// final report and removes the entry, freeing its state.
pub struct MeterRegistry {
    rate_card: RateCard,
    sessions: DashMap<SessionId, MeterState>,
}

impl MeterRegistry {
    pub fn new(rate_card: RateCard) -> Self {
        Self {
            rate_card,
            sessions: DashMap::new(),
        }
    }

    pub fn start_session(&self, session_id: SessionId, model: impl Into<String>) {
        debug!(%session_id, "meter session opened");
        self.sessions
            .insert(session_id.clone(), MeterState::new(session_id, model));
    }

    /// Apply `f` to the session's meter state, if it exists.
    pub fn with_session<R>(&self, session_id: &SessionId, f: impl FnOnce(&mut MeterState) -> R) -> Option<R> {
        self.sessions.get_mut(session_id).map(|mut entry| f(&mut entry))
    }

    /// Compute a report without ending the session.
    pub fn report(&self, session_id: &SessionId) -> Result<CostReport> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        entry.report(&self.rate_card)
    }

    /// Compute the final report and remove the session's state.
    pub fn end_session(&self, session_id: &SessionId) -> Result<CostReport> {
        let (_, state) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let report = state.report(&self.rate_card)?;
        debug!(%session_id, final_cost = report.final_cost, "meter session closed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_session_removes_state_and_further_reports_fail() {
        let registry = MeterRegistry::new(RateCard::default());
        let id = SessionId::generate();
        registry.start_session(id.clone(), "gpt-4o-realtime-preview");
        registry
            .with_session(&id, |meter| {
                meter.start_audio_input();
                meter.stop_audio_input();
            })
            .unwrap();
        assert!(registry.end_session(&id).is_ok());
        assert!(registry.report(&id).is_err());
    }

    #[test]
    fn report_on_unknown_session_is_not_found() {
        let registry = MeterRegistry::new(RateCard::default());
        assert!(registry.report(&SessionId::generate()).is_err());
    }
}
