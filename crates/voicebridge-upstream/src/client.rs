//! The duplex WebSocket client: connect, typed sends, and a per-client event
//! queue that is the Session Supervisor's sole source of upstream events.
//!
//! The source this was built against used a dynamic subscribe-by-name
//! emitter; here inbound frames are parsed into one tagged [`UpstreamEvent`]
//! enum and pushed onto an mpsc channel, so there is exactly one consumer and
//! ordering is explicit.

use crate::messages::{
    FunctionCallOutputItem, OutboundMessage, RawInboundMessage, SessionUpdatePayload,
    UpstreamEvent,
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use voicebridge_core::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct UpstreamClient {
    write: futures::stream::SplitSink<WsStream, Message>,
    events: mpsc::UnboundedReceiver<UpstreamEvent>,
}

impl UpstreamClient {
    /// Open the duplex connection. Returns once the socket itself is open;
    /// does not wait for `session.created`. Times out after 10s.
    pub async fn connect(ws_url: &str, ephemeral_token: &str) -> Result<Self> {
        let request = build_connect_request(ws_url, ephemeral_token)?;

        let (stream, _response) = tokio::time::timeout(
            CONNECT_TIMEOUT,
            tokio_tungstenite::connect_async(request),
        )
        .await
        .map_err(|_| Error::Timeout(CONNECT_TIMEOUT))?
        .map_err(|e| Error::Transport(format!("upstream connect failed: {e}")))?;

        let (write, mut read) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = parse_inbound(&text) {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((1000, String::new()));
                        let _ = tx.send(UpstreamEvent::Disconnected { code, reason });
                        break;
                    }
                    Some(Ok(_)) => continue, // binary/ping/pong frames carry no protocol meaning here
                    Some(Err(e)) => {
                        warn!(error = %e, "upstream read error");
                        let _ = tx.send(UpstreamEvent::Disconnected {
                            code: 1006,
                            reason: e.to_string(),
                        });
                        break;
                    }
                    None => {
                        let _ = tx.send(UpstreamEvent::Disconnected {
                            code: 1000,
                            reason: "stream ended".to_string(),
                        });
                        break;
                    }
                }
            }
        });

        Ok(Self { write, events: rx })
    }

    /// Pull the next typed event. `None` once the reader task has exited and
    /// all buffered events have been drained.
    pub async fn next_event(&mut self) -> Option<UpstreamEvent> {
        self.events.recv().await
    }

    pub async fn send_session_update(&mut self, session: SessionUpdatePayload) -> Result<()> {
        self.send(OutboundMessage::SessionUpdate { session }).await
    }

    pub async fn append_audio(&mut self, pcm24_b64: String) -> Result<()> {
        self.send(OutboundMessage::InputAudioBufferAppend { audio: pcm24_b64 })
            .await
    }

    pub async fn clear_input_audio(&mut self) -> Result<()> {
        self.send(OutboundMessage::InputAudioBufferClear).await
    }

    pub async fn create_response(&mut self) -> Result<()> {
        self.send(OutboundMessage::ResponseCreate).await
    }

    /// Idempotent on the upstream side: issuing it with no response in
    /// flight is harmless.
    pub async fn cancel_response(&mut self) -> Result<()> {
        self.send(OutboundMessage::ResponseCancel).await
    }

    pub async fn send_function_call_output(
        &mut self,
        call_id: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<()> {
        self.send(OutboundMessage::ConversationItemCreate {
            item: FunctionCallOutputItem::new(call_id, output),
        })
        .await
    }

    async fn send(&mut self, message: OutboundMessage) -> Result<()> {
        let text = serde_json::to_string(&message)?;
        self.write
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| Error::Transport(format!("upstream send failed: {e}")))
    }
}

fn build_connect_request(
    ws_url: &str,
    ephemeral_token: &str,
) -> Result<tokio_tungstenite::tungstenite::http::Request<()>> {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let mut request = ws_url
        .into_client_request()
        .map_err(|e| Error::Config(format!("invalid upstream url: {e}")))?;
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {ephemeral_token}")
            .parse()
            .map_err(|e| Error::Config(format!("invalid ephemeral token: {e}")))?,
    );
    Ok(request)
}

/// Map a raw inbound frame to a typed event. Unknown `type` values and
/// frames this client doesn't need to re-emit return `None`.
fn parse_inbound(text: &str) -> Option<UpstreamEvent> {
    let raw: RawInboundMessage = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "discarding malformed inbound frame");
            return None;
        }
    };

    match raw.kind.as_str() {
        "session.created" => raw
            .body
            .get("session")
            .and_then(|s| s.get("id"))
            .and_then(|v| v.as_str())
            .map(|id| UpstreamEvent::SessionCreated {
                upstream_session_id: id.to_string(),
            }),
        "session.updated" => Some(UpstreamEvent::SessionUpdated),
        "input_audio_buffer.speech_started" => Some(UpstreamEvent::SpeechStarted),
        "input_audio_buffer.speech_stopped" => Some(UpstreamEvent::SpeechStopped),
        "response.audio.delta" => raw
            .body
            .get("delta")
            .and_then(|v| v.as_str())
            .map(|b64| UpstreamEvent::AudioDelta {
                audio_b64: b64.to_string(),
            }),
        "response.audio.done" => Some(UpstreamEvent::AudioDone),
        "conversation.item.input_audio_transcription.completed" => raw
            .body
            .get("transcript")
            .and_then(|v| v.as_str())
            .map(|t| UpstreamEvent::TranscriptUser {
                transcript: t.to_string(),
            }),
        "response.audio_transcript.delta" => raw
            .body
            .get("delta")
            .and_then(|v| v.as_str())
            .map(|d| UpstreamEvent::TranscriptAgentDelta {
                delta: d.to_string(),
            }),
        "response.audio_transcript.done" => raw
            .body
            .get("transcript")
            .and_then(|v| v.as_str())
            .map(|t| UpstreamEvent::TranscriptAgent {
                transcript: t.to_string(),
            }),
        "response.created" => Some(UpstreamEvent::ResponseCreated),
        "response.done" => {
            let usage = raw
                .body
                .get("response")
                .and_then(|r| r.get("usage"))
                .and_then(|u| serde_json::from_value(u.clone()).ok());
            Some(UpstreamEvent::ResponseDone { usage })
        }
        "response.function_call_arguments.done" => {
            let name = raw.body.get("name").and_then(|v| v.as_str())?.to_string();
            let call_id = raw.body.get("call_id").and_then(|v| v.as_str())?.to_string();
            let arguments = raw
                .body
                .get("arguments")
                .and_then(|v| v.as_str())?
                .to_string();
            Some(UpstreamEvent::FunctionCall {
                name,
                call_id,
                arguments,
            })
        }
        "error" => {
            let message = raw
                .body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown upstream error")
                .to_string();
            Some(UpstreamEvent::Error { message })
        }
        _ => None, // forward compatibility: unknown types are silently ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_is_ignored() {
        assert!(parse_inbound(r#"{"type":"something.new"}"#).is_none());
    }

    #[test]
    fn malformed_json_is_ignored() {
        assert!(parse_inbound("not json").is_none());
    }

    #[test]
    fn function_call_done_extracts_fields() {
        let event = parse_inbound(
            r#"{"type":"response.function_call_arguments.done","name":"transfer_call","call_id":"call_1","arguments":"{\"queue\":\"billing\"}"}"#,
        )
        .unwrap();
        match event {
            UpstreamEvent::FunctionCall {
                name,
                call_id,
                arguments,
            } => {
                assert_eq!(name, "transfer_call");
                assert_eq!(call_id, "call_1");
                assert_eq!(arguments, r#"{"queue":"billing"}"#);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn response_done_extracts_usage() {
        let event = parse_inbound(
            r#"{"type":"response.done","response":{"usage":{"input_tokens":120,"output_tokens":45,"input_token_details":{"audio_tokens":100,"cached_tokens":20},"output_token_details":{"audio_tokens":40}}}}"#,
        )
        .unwrap();
        match event {
            UpstreamEvent::ResponseDone { usage } => {
                let usage = usage.expect("usage should parse");
                assert_eq!(usage.input_tokens, 120);
                assert_eq!(usage.input_token_details.cached_tokens, 20);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn session_created_extracts_session_id() {
        let event =
            parse_inbound(r#"{"type":"session.created","session":{"id":"sess_abc"}}"#).unwrap();
        match event {
            UpstreamEvent::SessionCreated { upstream_session_id } => {
                assert_eq!(upstream_session_id, "sess_abc");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
