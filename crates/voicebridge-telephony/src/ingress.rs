//! WebSocket-based telephony ingress: one upgraded connection per call,
//! bridging companded audio frames to and from a Session Supervisor.

use crate::directory::Directory;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use voicebridge_bus::ControlBusAdapter;
use voicebridge_core::{CallerId, RateCard};
use voicebridge_observability::Metrics;
use voicebridge_session::{SessionSupervisor, SupervisorRegistry};
use voicebridge_tools::ToolDispatcher;

pub struct IngressState {
    pub directory: Arc<dyn Directory>,
    pub registry: Arc<SupervisorRegistry>,
    pub http_client: reqwest::Client,
    pub bootstrap_url: String,
    pub ws_url: String,
    pub api_key: String,
    pub rate_card: Arc<RateCard>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub bus: Arc<dyn ControlBusAdapter>,
    pub metrics: Arc<Metrics>,
    pub vad_threshold: f32,
    pub silence_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct CallQuery {
    pub caller: String,
    pub port: Option<u16>,
}

pub fn router(state: Arc<IngressState>) -> Router {
    Router::new()
        .route("/telephony/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    State(state): State<Arc<IngressState>>,
    Query(params): Query<CallQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_call(socket, state, params))
}

/// One call's whole lifetime: resolve identity, stand up a Supervisor,
/// bridge audio in both directions until either side hangs up.
async fn handle_call(socket: WebSocket, state: Arc<IngressState>, params: CallQuery) {
    let caller_id = CallerId::from(params.caller);

    let entry = match state.directory.resolve(&caller_id, params.port).await {
        Ok(entry) => entry,
        Err(e) => {
            warn!(caller_id = %caller_id, error = %e, "directory resolution failed, rejecting call");
            return;
        }
    };

    let handle = match SessionSupervisor::start(
        state.http_client.clone(),
        &state.bootstrap_url,
        &state.ws_url,
        &state.api_key,
        caller_id.clone(),
        entry.tenant_id,
        entry.agent_id,
        entry.agent_config,
        params.port,
        state.rate_card.clone(),
        state.dispatcher.clone(),
        state.bus.clone(),
        state.metrics.clone(),
        state.vad_threshold,
        state.silence_duration_ms,
    )
    .await
    {
        Ok(handle) => Arc::new(handle),
        Err(e) => {
            warn!(caller_id = %caller_id, error = %e, "failed to start session, rejecting call");
            return;
        }
    };

    let session_id = handle.session_id.clone();
    state.registry.insert(handle.clone());
    info!(%session_id, caller_id = %caller_id, "call accepted");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let audio_in_tx = handle.audio_in_tx.clone();

    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Binary(bytes) => {
                    let samples = voicebridge_codec::mulaw_decode(&bytes);
                    if audio_in_tx.send(samples).await.is_err() {
                        break;
                    }
                }
                WsMessage::Close(_) => break,
                _ => continue,
            }
        }
    });

    let handle_for_writer = handle.clone();
    let writer = tokio::spawn(async move {
        loop {
            let frame = handle_for_writer.audio_out_rx.lock().await.recv().await;
            match frame {
                Some(frame) => {
                    let current = handle_for_writer.response_generation.load(std::sync::atomic::Ordering::Relaxed);
                    if frame.generation != current {
                        // stale: discarded by a barge-in cancellation that
                        // landed after this frame was already queued
                        continue;
                    }
                    if ws_tx.send(WsMessage::Binary(frame.bytes.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    });

    let _ = reader.await;
    writer.abort();
    state.registry.remove(&session_id);
    drop(handle);
    info!(%session_id, "call ended, session torn down");
}
