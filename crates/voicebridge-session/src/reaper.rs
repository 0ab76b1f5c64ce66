//! Periodic sweep that terminates sessions idle past the configured
//! timeout. Exemption policy (open question #1, spec §9): a session with
//! audio actively flowing or a response in flight is never reaped purely
//! for having gone quiet between turns — only genuine silence with nothing
//! in flight counts as idle. See DESIGN.md.

use crate::registry::SupervisorRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub struct Reaper {
    registry: Arc<SupervisorRegistry>,
    idle_timeout_ms: i64,
    sweep_interval: Duration,
}

impl Reaper {
    pub fn new(registry: Arc<SupervisorRegistry>, idle_timeout_ms: i64) -> Self {
        Self {
            registry,
            idle_timeout_ms,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Run the sweep loop forever. Intended to be spawned as its own task.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        loop {
            ticker.tick().await;
            self.sweep();
        }
    }

    /// One sweep pass: request shutdown for every handle idle past the
    /// timeout and not currently exempt. Actual removal from the registry
    /// happens when the Supervisor's own task tears down and the owner
    /// (telephony ingress) drops its handle; the reaper only signals.
    fn sweep(&self) {
        let now = chrono::Utc::now().timestamp_millis();
        let mut reaped = 0usize;
        for handle in self.registry.handles() {
            if handle.is_idle_exempt() {
                continue;
            }
            if handle.idle_for_ms(now) >= self.idle_timeout_ms {
                info!(session_id = %handle.session_id, "reaping idle session");
                handle.request_shutdown();
                reaped += 1;
            }
        }
        if reaped > 0 {
            debug!(reaped, "idle sweep complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::{OutboundAudioFrame, SupervisorHandle};
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64};
    use tokio::sync::{mpsc, watch, Mutex};
    use voicebridge_core::{AgentId, CallerId, SessionId, TenantId};

    fn handle_with(last_activity_ms: i64, audio_active: bool, response_in_flight: bool) -> Arc<SupervisorHandle> {
        let (audio_in_tx, _audio_in_rx) = mpsc::channel(1);
        let (_audio_out_tx, audio_out_rx) = mpsc::channel::<OutboundAudioFrame>(1);
        let (terminate_tx, _terminate_rx) = watch::channel(false);
        Arc::new(SupervisorHandle {
            session_id: SessionId::generate(),
            caller_id: CallerId::from("caller"),
            tenant_id: TenantId::from("tenant"),
            agent_id: AgentId::from("agent"),
            last_activity_epoch_ms: Arc::new(AtomicI64::new(last_activity_ms)),
            audio_active: Arc::new(AtomicBool::new(audio_active)),
            response_in_flight: Arc::new(AtomicBool::new(response_in_flight)),
            response_generation: Arc::new(AtomicU64::new(0)),
            audio_in_tx,
            audio_out_rx: Mutex::new(audio_out_rx),
            terminate_tx,
        })
    }

    #[test]
    fn reaps_genuinely_idle_session() {
        let registry = Arc::new(SupervisorRegistry::new());
        let handle = handle_with(0, false, false);
        registry.insert(handle.clone());
        let reaper = Reaper::new(registry, 1000);
        reaper.sweep();
        assert!(*handle.terminate_tx.borrow());
    }

    #[test]
    fn exempts_session_with_active_audio() {
        let registry = Arc::new(SupervisorRegistry::new());
        let handle = handle_with(0, true, false);
        registry.insert(handle.clone());
        let reaper = Reaper::new(registry, 1000);
        reaper.sweep();
        assert!(!*handle.terminate_tx.borrow());
    }

    #[test]
    fn exempts_session_with_response_in_flight() {
        let registry = Arc::new(SupervisorRegistry::new());
        let handle = handle_with(0, false, true);
        registry.insert(handle.clone());
        let reaper = Reaper::new(registry, 1000);
        reaper.sweep();
        assert!(!*handle.terminate_tx.borrow());
    }

    #[test]
    fn leaves_recently_active_session_alone() {
        let registry = Arc::new(SupervisorRegistry::new());
        let handle = handle_with(chrono::Utc::now().timestamp_millis(), false, false);
        registry.insert(handle.clone());
        let reaper = Reaper::new(registry, 300_000);
        reaper.sweep();
        assert!(!*handle.terminate_tx.borrow());
    }
}
