//! Agent configuration snapshot and tool definitions.
//!
//! [`AgentConfig`] is loaded once per session by the telephony ingress and
//! never mutated afterwards — it is an immutable snapshot, cloned into the
//! `Session` at creation time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    /// The bridge knows the tool by name and runs it in-process.
    Inline,
    /// The bridge forwards the call as an HTTP request to a configured endpoint.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpToolConfig {
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: std::collections::HashMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retries() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique within the owning agent.
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub dispatch: DispatchKind,
    /// Present iff `dispatch == Http`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpToolConfig>,
}

/// Per-tenant channel to publish to when this agent's `transfer_call` tool fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub channel: String,
    pub default_queue: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            channel: "aiva_call".to_string(),
            default_queue: "general".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub instructions: String,
    pub voice: String,
    pub model: String,
    pub temperature: f32,
    pub max_response_tokens: u32,
    pub language: String,
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub transfer: TransferConfig,
}

impl AgentConfig {
    /// Look up a tool definition by name, as `function.call` events carry only the name.
    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }
}
