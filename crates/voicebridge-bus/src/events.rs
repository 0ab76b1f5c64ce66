//! JSON event schemas published onto the control bus.

use chrono::{DateTime, Utc};
use serde::Serialize;
use voicebridge_core::{AgentId, CallerId, SessionId, TenantId};

/// Channel carrying transfer requests and call-lifecycle events.
pub const CHANNEL_AIVA_CALL: &str = "aiva_call";

/// Published when the call-transfer tool runs. Field names mirror the
/// consumer contract the bridge was built against; see DESIGN.md for the
/// one undocumented aspect (the `asterisk_port` carrier).
#[derive(Debug, Clone, Serialize)]
pub struct TransferEvent {
    pub session_id: SessionId,
    pub caller_id: CallerId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub asterisk_port: Option<u16>,
    pub aiva_transfer_to_agent: bool,
    pub aiva_transfer_to_agent_queue: String,
    pub timestamp: DateTime<Utc>,
}

impl TransferEvent {
    pub fn new(
        session_id: SessionId,
        caller_id: CallerId,
        tenant_id: TenantId,
        agent_id: AgentId,
        asterisk_port: Option<u16>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            caller_id,
            tenant_id,
            agent_id,
            asterisk_port,
            aiva_transfer_to_agent: true,
            aiva_transfer_to_agent_queue: queue.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Published when a session ends normally, carrying the final cost report.
#[derive(Debug, Clone, Serialize)]
pub struct CallEndedEvent {
    pub session_id: SessionId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub status: String,
    pub duration_seconds: f64,
    pub base_cost: f64,
    pub final_cost: f64,
    pub audio_in_seconds: f64,
    pub audio_out_seconds: f64,
    pub text_in_tokens: u64,
    pub text_out_tokens: u64,
    pub cached_tokens: u64,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Published when a session never reaches `READY` (e.g. bootstrap auth
/// failure).
#[derive(Debug, Clone, Serialize)]
pub struct CallFailedEvent {
    pub session_id: SessionId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}
