//! Tools the bridge knows how to run itself, without an outbound HTTP call.

use crate::result::ToolResult;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use voicebridge_bus::{ControlBusAdapter, TransferEvent, CHANNEL_AIVA_CALL};
use voicebridge_core::{AgentId, CallerId, SessionId, TenantId};

/// The one inline tool the spec names: call-transfer. Any other
/// `dispatch: inline` tool name is a configuration error the agent should
/// not have shipped with, surfaced as a dispatch failure rather than a panic.
pub const TRANSFER_TOOL_NAME: &str = "transfer_call";

pub struct TransferContext {
    pub session_id: SessionId,
    pub caller_id: CallerId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub asterisk_port: Option<u16>,
    pub default_queue: String,
}

/// Build and publish a transfer event. The handoff itself is the
/// subscriber's problem: a successful publish is treated as tool success.
pub async fn dispatch_transfer(
    bus: &Arc<dyn ControlBusAdapter>,
    channel: &str,
    ctx: &TransferContext,
    arguments: &Value,
) -> ToolResult {
    let queue = arguments
        .get("queue")
        .and_then(Value::as_str)
        .unwrap_or(&ctx.default_queue)
        .to_string();

    let event = TransferEvent::new(
        ctx.session_id.clone(),
        ctx.caller_id.clone(),
        ctx.tenant_id.clone(),
        ctx.agent_id.clone(),
        ctx.asterisk_port,
        queue.clone(),
    );

    match bus.publish_event(channel, &event).await {
        Ok(()) => ToolResult::ok_with_message(
            "Transferring…",
            serde_json::json!({ "queue": queue }),
        ),
        Err(e) => {
            warn!(error = %e, %channel, "transfer event publish failed");
            ToolResult::err(e.to_string())
        }
    }
}

/// Default channel used for transfer and call-lifecycle events when the
/// agent config doesn't specify one.
pub fn default_channel() -> &'static str {
    CHANNEL_AIVA_CALL
}
