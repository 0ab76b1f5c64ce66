//! Wire-level message shapes for the upstream realtime protocol: JSON
//! objects with a mandatory `type` discriminator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use voicebridge_meter::UsageReport;

/// Server-side voice-activity-detection parameters sent in `session.update`.
#[derive(Debug, Clone, Serialize)]
pub struct TurnDetectionConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f64,
    pub silence_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdatePayload {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub input_audio_transcription: Value,
    pub turn_detection: TurnDetectionConfig,
    pub tools: Vec<Value>,
    pub max_response_output_tokens: u32,
    pub temperature: f64,
}

/// Messages the bridge sends upstream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdatePayload },

    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },

    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear,

    #[serde(rename = "response.create")]
    ResponseCreate,

    #[serde(rename = "response.cancel")]
    ResponseCancel,

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: FunctionCallOutputItem },
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionCallOutputItem {
    #[serde(rename = "type")]
    pub kind: String, // always "function_call_output"
    pub call_id: String,
    pub output: String,
}

impl FunctionCallOutputItem {
    pub fn new(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind: "function_call_output".to_string(),
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// Raw inbound frame, deserialised only as far as the discriminator; the
/// rest is parsed per-variant in [`crate::client`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawInboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub body: Value,
}

/// Typed events the client re-emits for inbound frames it recognises.
/// Unknown inbound `type` values never reach this enum — they're dropped at
/// the point of recognition for forward compatibility.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum UpstreamEvent {
    SessionCreated { upstream_session_id: String },
    SessionUpdated,
    SpeechStarted,
    SpeechStopped,
    AudioDelta { audio_b64: String },
    AudioDone,
    TranscriptUser { transcript: String },
    TranscriptAgentDelta { delta: String },
    TranscriptAgent { transcript: String },
    ResponseCreated,
    ResponseDone { usage: Option<UsageReport> },
    FunctionCall {
        name: String,
        call_id: String,
        arguments: String,
    },
    Error { message: String },
    Disconnected { code: u16, reason: String },
}
