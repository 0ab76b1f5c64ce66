//! Turns an upstream `function.call` event into a structured result,
//! forwarding the outcome to the Context Accumulator before handing it back.

use crate::http_tool::dispatch_http;
use crate::inline::{dispatch_transfer, TransferContext, TRANSFER_TOOL_NAME};
use crate::result::ToolResult;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use voicebridge_bus::ControlBusAdapter;
use voicebridge_context::ContextBuffer;
use voicebridge_core::agent::{DispatchKind, ToolDefinition};

/// A tool invocation as the upstream model emitted it: arguments arrive as a
/// JSON-encoded string, not a parsed value.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    pub call_id: String,
    pub arguments: String,
}

pub struct ToolDispatcher {
    client: Client,
    bus: Arc<dyn ControlBusAdapter>,
}

impl ToolDispatcher {
    pub fn new(client: Client, bus: Arc<dyn ControlBusAdapter>) -> Self {
        Self { client, bus }
    }

    /// Dispatch `call` against `tool`. Invalid JSON arguments short-circuit
    /// without invoking anything. Every result, successful or not, is
    /// recorded into `context` before being returned.
    ///
    /// `cancel` lets the caller abort an in-flight HTTP tool call (e.g. on
    /// session termination); the result is then recorded as `"aborted"`
    /// rather than forwarded to the model.
    pub async fn dispatch(
        &self,
        tool: &ToolDefinition,
        call: &ToolCall,
        channel: &str,
        transfer_ctx: &TransferContext,
        context: &mut ContextBuffer,
        cancel: &mut watch::Receiver<bool>,
    ) -> ToolResult {
        let arguments: Value = match serde_json::from_str(&call.arguments) {
            Ok(v) => v,
            Err(_) => {
                let result = ToolResult::err("invalid_arguments");
                context.add_tool_result(call.name.clone(), Value::Null, result.as_json());
                return result;
            }
        };

        let result = match tool.dispatch {
            DispatchKind::Inline if tool.name == TRANSFER_TOOL_NAME => {
                dispatch_transfer(&self.bus, channel, transfer_ctx, &arguments).await
            }
            DispatchKind::Inline => ToolResult::err(format!(
                "no inline handler registered for tool '{}'",
                tool.name
            )),
            DispatchKind::Http => match &tool.http {
                Some(http_config) => dispatch_http(&self.client, http_config, &arguments, cancel).await,
                None => ToolResult::err(format!(
                    "tool '{}' is configured for http dispatch but has no http config",
                    tool.name
                )),
            },
        };

        context.add_tool_result(call.name.clone(), arguments, result.as_json());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicebridge_core::agent::ToolDefinition;
    use voicebridge_core::{AgentId, CallerId, SessionId, TenantId};

    struct NullBus;

    #[async_trait::async_trait]
    impl ControlBusAdapter for NullBus {
        async fn publish(&self, _channel: &str, _payload: &[u8]) -> voicebridge_core::Result<()> {
            Ok(())
        }
        async fn subscribe(
            &self,
            _channel: &str,
            _handler: voicebridge_bus::BusHandler,
        ) -> voicebridge_core::Result<()> {
            Ok(())
        }
    }

    fn test_transfer_ctx() -> TransferContext {
        TransferContext {
            session_id: SessionId::generate(),
            caller_id: CallerId::from("caller-1".to_string()),
            tenant_id: TenantId::from("tenant-1".to_string()),
            agent_id: AgentId::from("agent-1".to_string()),
            asterisk_port: Some(5060),
            default_queue: "general".to_string(),
        }
    }

    #[tokio::test]
    async fn invalid_json_arguments_short_circuit() {
        let dispatcher = ToolDispatcher::new(Client::new(), Arc::new(NullBus));
        let tool = ToolDefinition {
            name: TRANSFER_TOOL_NAME.to_string(),
            description: String::new(),
            parameters: Value::Null,
            dispatch: DispatchKind::Inline,
            http: None,
        };
        let call = ToolCall {
            name: TRANSFER_TOOL_NAME.to_string(),
            call_id: "call-1".to_string(),
            arguments: "not json".to_string(),
        };
        let mut context = ContextBuffer::default();
        let (_tx, mut cancel) = watch::channel(false);
        let result = dispatcher
            .dispatch(&tool, &call, "aiva_call", &test_transfer_ctx(), &mut context, &mut cancel)
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("invalid_arguments"));
        assert_eq!(context.entries().count(), 1);
    }

    #[tokio::test]
    async fn transfer_call_dispatches_inline_and_records_context() {
        let dispatcher = ToolDispatcher::new(Client::new(), Arc::new(NullBus));
        let tool = ToolDefinition {
            name: TRANSFER_TOOL_NAME.to_string(),
            description: String::new(),
            parameters: Value::Null,
            dispatch: DispatchKind::Inline,
            http: None,
        };
        let call = ToolCall {
            name: TRANSFER_TOOL_NAME.to_string(),
            call_id: "call-1".to_string(),
            arguments: r#"{"queue":"billing"}"#.to_string(),
        };
        let mut context = ContextBuffer::default();
        let (_tx, mut cancel) = watch::channel(false);
        let result = dispatcher
            .dispatch(&tool, &call, "aiva_call", &test_transfer_ctx(), &mut context, &mut cancel)
            .await;
        assert!(result.success);
        assert_eq!(context.entries().count(), 1);
    }
}
