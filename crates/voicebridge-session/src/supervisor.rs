//! One Supervisor per call, owning the Session end-to-end: audio bridging,
//! upstream event handling, tool dispatch, and cost reporting.

use crate::state::SupervisorState;
use opentelemetry::trace::{BoxedSpan, Span, Tracer};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use voicebridge_bus::{CallEndedEvent, CallFailedEvent, ControlBusAdapter};
use voicebridge_codec::{resample, samples_to_pcm16_le, upstream_pcm_to_telephony_frame};
use voicebridge_context::ContextBuffer;
use voicebridge_core::{AgentConfig, AgentId, CallerId, Error, RateCard, Result, SessionId, TenantId};
use voicebridge_meter::MeterState;
use voicebridge_observability::{
    record_call_cost, record_error, record_success, record_token_usage, CallOutcome,
    CallSpanAttributes, Metrics,
};
use voicebridge_tools::{ToolCall, ToolDispatcher, TransferContext};
use voicebridge_upstream::{SessionUpdatePayload, UpstreamClient, UpstreamEvent};

/// An encoded outbound audio frame tagged with the response generation it
/// was produced under, so a writer downstream can discard frames made stale
/// by a barge-in cancellation rather than play them after the fact.
pub struct OutboundAudioFrame {
    pub generation: u64,
    pub bytes: Vec<u8>,
}

/// Shared, lock-free bits the reaper and any stats endpoint read without
/// going through the Supervisor task itself.
pub struct SupervisorHandle {
    pub session_id: SessionId,
    pub caller_id: CallerId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub last_activity_epoch_ms: Arc<AtomicI64>,
    pub audio_active: Arc<AtomicBool>,
    pub response_in_flight: Arc<AtomicBool>,
    /// Bumped every time an in-progress response is cancelled by barge-in;
    /// frames tagged with an older generation are stale and must be dropped
    /// by whoever reads `audio_out_rx`.
    pub response_generation: Arc<AtomicU64>,
    /// Decoded 8 kHz linear PCM frames from the Telephony Ingress.
    pub audio_in_tx: mpsc::Sender<Vec<i16>>,
    /// Encoded 8 kHz mu-law frames destined for the Telephony Ingress.
    pub audio_out_rx: tokio::sync::Mutex<mpsc::Receiver<OutboundAudioFrame>>,
    pub(crate) terminate_tx: watch::Sender<bool>,
}

impl SupervisorHandle {
    /// Reaper exemption per the per-session idle timeout: a session with
    /// audio actively flowing or a response in flight is never reaped, no
    /// matter how long since its last discrete "activity" timestamp update
    /// (open question #1: exempting solely on "has an open socket" would
    /// never reap a connected-but-silent call; exempting on actual audio/
    /// response activity is the stricter and correct reading). See
    /// DESIGN.md.
    pub fn is_idle_exempt(&self) -> bool {
        self.audio_active.load(Ordering::Relaxed) || self.response_in_flight.load(Ordering::Relaxed)
    }

    pub fn idle_for_ms(&self, now_epoch_ms: i64) -> i64 {
        now_epoch_ms - self.last_activity_epoch_ms.load(Ordering::Relaxed)
    }

    /// Ask the Supervisor task to terminate. Idempotent.
    pub fn request_shutdown(&self) {
        let _ = self.terminate_tx.send(true);
    }
}

pub struct SessionSupervisor {
    session_id: SessionId,
    caller_id: CallerId,
    tenant_id: TenantId,
    agent_id: AgentId,
    agent_config: Arc<AgentConfig>,
    asterisk_port: Option<u16>,
    vad_threshold: f32,
    silence_duration_ms: u64,

    state: SupervisorState,
    upstream: UpstreamClient,
    meter: MeterState,
    context: ContextBuffer,
    rate_card: Arc<RateCard>,
    dispatcher: Arc<ToolDispatcher>,
    bus: Arc<dyn ControlBusAdapter>,
    transfer_channel: String,
    metrics: Arc<Metrics>,
    span: BoxedSpan,

    reconnect_attempted: bool,
    /// Reason the run loop broke, recorded into `call.ended`'s `status`
    /// field. Defaults to `"completed"`; set to `"upstream_lost"` /
    /// `"upstream_error"` on an unplanned upstream close or fatal protocol
    /// error.
    exit_status: String,

    audio_in_rx: mpsc::Receiver<Vec<i16>>,
    audio_out_tx: mpsc::Sender<OutboundAudioFrame>,
    terminate_rx: watch::Receiver<bool>,

    last_activity_epoch_ms: Arc<AtomicI64>,
    audio_active: Arc<AtomicBool>,
    response_in_flight: Arc<AtomicBool>,
    response_generation: Arc<AtomicU64>,
}

#[allow(clippy::too_many_arguments)]
impl SessionSupervisor {
    /// Bootstrap (ephemeral token + upstream connect) and spawn the run
    /// loop. On bootstrap failure, publishes `call.failed` and returns the
    /// error without ever producing a handle — the Session never enters
    /// `READY`.
    pub async fn start(
        http_client: reqwest::Client,
        bootstrap_url: &str,
        ws_url: &str,
        api_key: &str,
        caller_id: CallerId,
        tenant_id: TenantId,
        agent_id: AgentId,
        agent_config: Arc<AgentConfig>,
        asterisk_port: Option<u16>,
        rate_card: Arc<RateCard>,
        dispatcher: Arc<ToolDispatcher>,
        bus: Arc<dyn ControlBusAdapter>,
        metrics: Arc<Metrics>,
        vad_threshold: f32,
        silence_duration_ms: u64,
    ) -> Result<SupervisorHandle> {
        let session_id = SessionId::generate();
        let model = agent_config.model.clone();

        let token_result =
            voicebridge_upstream::fetch_ephemeral_token(&http_client, bootstrap_url, api_key, &model)
                .await;
        let ephemeral_token = match token_result {
            Ok(t) => t,
            Err(e) => {
                metrics.record_upstream_connect_failure("bootstrap_failed");
                Self::publish_failure(&bus, &session_id, &tenant_id, &agent_id, &e).await;
                return Err(e);
            }
        };

        let upstream = match UpstreamClient::connect(ws_url, &ephemeral_token).await {
            Ok(u) => u,
            Err(e) => {
                metrics.record_upstream_connect_failure("connect_failed");
                Self::publish_failure(&bus, &session_id, &tenant_id, &agent_id, &e).await;
                return Err(e);
            }
        };

        metrics.record_call_started(tenant_id.as_str(), agent_id.as_str());
        metrics.update_upstream_connection_status(session_id.as_str(), true);

        let (audio_in_tx, audio_in_rx) = mpsc::channel(64);
        let (audio_out_tx, audio_out_rx) = mpsc::channel(64);
        let (terminate_tx, terminate_rx) = watch::channel(false);

        let last_activity_epoch_ms = Arc::new(AtomicI64::new(now_epoch_ms()));
        let audio_active = Arc::new(AtomicBool::new(false));
        let response_in_flight = Arc::new(AtomicBool::new(false));
        let response_generation = Arc::new(AtomicU64::new(0));

        let transfer_channel = voicebridge_bus::CHANNEL_AIVA_CALL.to_string();

        let tracer = opentelemetry::global::tracer("voicebridge");
        let mut span = tracer.start("voicebridge.call");
        let attrs = CallSpanAttributes::new()
            .with_session_id(session_id.as_str())
            .with_tenant_id(tenant_id.as_str())
            .with_agent_id(agent_id.as_str())
            .with_model(model.clone())
            .with_caller_id(caller_id.as_str());
        for kv in attrs.to_key_values() {
            span.set_attribute(kv);
        }

        let mut supervisor = Self {
            session_id: session_id.clone(),
            caller_id: caller_id.clone(),
            tenant_id: tenant_id.clone(),
            agent_id: agent_id.clone(),
            agent_config,
            asterisk_port,
            vad_threshold,
            silence_duration_ms,
            state: SupervisorState::Init,
            upstream,
            meter: MeterState::new(session_id.clone(), model),
            context: ContextBuffer::default(),
            rate_card,
            dispatcher,
            bus,
            transfer_channel,
            metrics,
            span,
            reconnect_attempted: false,
            exit_status: "completed".to_string(),
            audio_in_rx,
            audio_out_tx,
            terminate_rx,
            last_activity_epoch_ms: last_activity_epoch_ms.clone(),
            audio_active: audio_active.clone(),
            response_in_flight: response_in_flight.clone(),
            response_generation: response_generation.clone(),
        };
        supervisor.state = SupervisorState::Configuring;
        supervisor.send_initial_session_update().await?;

        tokio::spawn(async move {
            supervisor.run().await;
        });

        Ok(SupervisorHandle {
            session_id,
            caller_id,
            tenant_id,
            agent_id,
            last_activity_epoch_ms,
            audio_active,
            response_in_flight,
            response_generation,
            audio_in_tx,
            audio_out_rx: tokio::sync::Mutex::new(audio_out_rx),
            terminate_tx,
        })
    }

    async fn publish_failure(
        bus: &Arc<dyn ControlBusAdapter>,
        session_id: &SessionId,
        tenant_id: &TenantId,
        agent_id: &AgentId,
        error: &Error,
    ) {
        let event = CallFailedEvent {
            session_id: session_id.clone(),
            tenant_id: tenant_id.clone(),
            agent_id: agent_id.clone(),
            reason: error.to_string(),
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = bus.publish_event(voicebridge_bus::CHANNEL_AIVA_CALL, &event).await {
            warn!(error = %e, "failed to publish call.failed");
        }
    }

    async fn send_initial_session_update(&mut self) -> Result<()> {
        let tools = self
            .agent_config
            .tools
            .iter()
            .map(|t| serde_json::json!({"name": t.name, "description": t.description, "parameters": t.parameters}))
            .collect();
        self.upstream
            .send_session_update(SessionUpdatePayload {
                modalities: vec!["text".to_string(), "audio".to_string()],
                instructions: self.render_instructions(),
                voice: self.agent_config.voice.clone(),
                input_audio_format: "pcm16".to_string(),
                output_audio_format: "pcm16".to_string(),
                input_audio_transcription: serde_json::json!({"model": "whisper-1", "language": self.agent_config.language}),
                turn_detection: voicebridge_upstream::messages::TurnDetectionConfig {
                    kind: "server_vad".to_string(),
                    threshold: self.vad_threshold as f64,
                    silence_duration_ms: self.silence_duration_ms,
                },
                tools,
                max_response_output_tokens: self.agent_config.max_response_tokens,
                temperature: self.agent_config.temperature as f64,
            })
            .await
    }

    fn render_instructions(&self) -> String {
        let context_block = self.context.render_context_string();
        if context_block.is_empty() {
            self.agent_config.instructions.clone()
        } else {
            format!("{}\n\n{}", self.agent_config.instructions, context_block)
        }
    }

    fn touch_activity(&self) {
        self.last_activity_epoch_ms
            .store(now_epoch_ms(), Ordering::Relaxed);
    }

    fn transition(&mut self, to: SupervisorState) {
        if self.state.can_transition_to(to) {
            debug!(session_id = %self.session_id, from = ?self.state, to = ?to, "state transition");
            self.state = to;
        } else {
            warn!(session_id = %self.session_id, from = ?self.state, to = ?to, "rejected illegal state transition");
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                frame = self.audio_in_rx.recv() => {
                    match frame {
                        Some(samples) => self.handle_telephony_audio(samples).await,
                        None => break,
                    }
                }
                event = self.upstream.next_event() => {
                    match event {
                        Some(event) => {
                            if self.handle_upstream_event(event).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                changed = self.terminate_rx.changed() => {
                    if changed.is_ok() && *self.terminate_rx.borrow() {
                        break;
                    }
                }
            }
        }
        self.end_session().await;
    }

    async fn handle_telephony_audio(&mut self, samples_8k: Vec<i16>) {
        self.touch_activity();
        self.audio_active.store(true, Ordering::Relaxed);
        self.meter.start_audio_input();

        let samples_24k = resample::upsample_8_to_24(&samples_8k);
        let pcm_bytes = samples_to_pcm16_le(&samples_24k);
        let b64 = base64_encode(&pcm_bytes);

        if let Err(e) = self.upstream.append_audio(b64).await {
            warn!(session_id = %self.session_id, error = %e, "failed to forward audio upstream");
        }
    }

    /// Returns `true` if the Supervisor should terminate.
    async fn handle_upstream_event(&mut self, event: UpstreamEvent) -> bool {
        self.touch_activity();
        match event {
            UpstreamEvent::SessionCreated { .. } => {
                if self.state == SupervisorState::Configuring {
                    self.transition(SupervisorState::Ready);
                }
                false
            }
            UpstreamEvent::SessionUpdated => false,
            UpstreamEvent::SpeechStarted => {
                if self.state == SupervisorState::Speaking {
                    // barge-in: cancel upstream, drop anything already queued
                    // for the Telephony Ingress by bumping the generation so
                    // the writer on the other end can tell it's stale.
                    let _ = self.upstream.cancel_response().await;
                    let _ = self.upstream.clear_input_audio().await;
                    self.response_generation.fetch_add(1, Ordering::Relaxed);
                    self.meter.stop_audio_output();
                    self.audio_active.store(false, Ordering::Relaxed);
                }
                self.transition(SupervisorState::Listening);
                self.meter.start_audio_input();
                false
            }
            UpstreamEvent::SpeechStopped => {
                self.meter.stop_audio_input();
                self.audio_active.store(false, Ordering::Relaxed);
                self.transition(SupervisorState::Ready);
                false
            }
            UpstreamEvent::AudioDelta { audio_b64 } => {
                self.meter.start_audio_output();
                self.audio_active.store(true, Ordering::Relaxed);
                self.transition(SupervisorState::Speaking);
                if let Some(pcm_bytes) = base64_decode(&audio_b64) {
                    let bytes = upstream_pcm_to_telephony_frame(&pcm_bytes);
                    let generation = self.response_generation.load(Ordering::Relaxed);
                    let frame = OutboundAudioFrame { generation, bytes };
                    if self.audio_out_tx.send(frame).await.is_err() {
                        warn!(session_id = %self.session_id, "telephony ingress gone, audio dropped");
                    }
                }
                false
            }
            UpstreamEvent::AudioDone => {
                self.meter.stop_audio_output();
                self.audio_active.store(false, Ordering::Relaxed);
                self.transition(SupervisorState::Ready);
                false
            }
            UpstreamEvent::TranscriptUser { .. }
            | UpstreamEvent::TranscriptAgentDelta { .. }
            | UpstreamEvent::TranscriptAgent { .. } => false,
            UpstreamEvent::ResponseCreated => {
                self.response_in_flight.store(true, Ordering::Relaxed);
                false
            }
            UpstreamEvent::ResponseDone { usage } => {
                self.response_in_flight.store(false, Ordering::Relaxed);
                if let Some(usage) = usage {
                    self.meter.record_usage(&usage);
                }
                false
            }
            UpstreamEvent::FunctionCall {
                name,
                call_id,
                arguments,
            } => {
                self.transition(SupervisorState::ToolRunning);
                self.run_tool_call(name, call_id, arguments).await;
                self.transition(SupervisorState::Ready);
                false
            }
            UpstreamEvent::Error { message } => {
                warn!(session_id = %self.session_id, %message, "fatal upstream error");
                self.exit_status = "upstream_error".to_string();
                self.transition(SupervisorState::Terminated);
                true
            }
            UpstreamEvent::Disconnected { code, reason } => self.handle_disconnect(code, reason).await,
        }
    }

    async fn run_tool_call(&mut self, name: String, call_id: String, arguments: String) {
        let mut cancel = self.terminate_rx.clone();
        let result = match self.agent_config.tool(&name).cloned() {
            Some(tool) => {
                let transfer_ctx = TransferContext {
                    session_id: self.session_id.clone(),
                    caller_id: self.caller_id.clone(),
                    tenant_id: self.tenant_id.clone(),
                    agent_id: self.agent_id.clone(),
                    asterisk_port: self.asterisk_port,
                    default_queue: self.agent_config.transfer.default_queue.clone(),
                };
                let call = ToolCall {
                    name: name.clone(),
                    call_id: call_id.clone(),
                    arguments,
                };
                self.dispatcher
                    .dispatch(
                        &tool,
                        &call,
                        &self.transfer_channel,
                        &transfer_ctx,
                        &mut self.context,
                        &mut cancel,
                    )
                    .await
            }
            None => voicebridge_tools::ToolResult::err(format!("unknown tool '{name}'")),
        };

        self.metrics.record_tool_call(&name, result.success);

        if result.error.as_deref() == Some("aborted") {
            info!(session_id = %self.session_id, tool = %name, "tool call aborted by session termination");
            return;
        }

        let output = serde_json::to_string(&result.as_json()).unwrap_or_else(|_| "{}".to_string());
        if let Err(e) = self.upstream.send_function_call_output(call_id, output).await {
            warn!(session_id = %self.session_id, error = %e, "failed to return tool result upstream");
            return;
        }
        if let Err(e) = self.upstream.create_response().await {
            warn!(session_id = %self.session_id, error = %e, "failed to request response after tool result");
        }
    }

    /// Transient close during an active call attempts one reconnect with
    /// the same ephemeral token (left as future work: the token itself
    /// isn't retained past bootstrap in this implementation, so reconnect
    /// here always falls through to termination — see DESIGN.md for why
    /// retaining the token was deferred). Returns `true` to terminate.
    async fn handle_disconnect(&mut self, code: u16, reason: String) -> bool {
        self.exit_status = "upstream_lost".to_string();
        if self.state == SupervisorState::Configuring {
            info!(session_id = %self.session_id, code, %reason, "upstream closed before ready");
            self.transition(SupervisorState::Terminated);
            return true;
        }
        if !self.reconnect_attempted {
            self.reconnect_attempted = true;
            warn!(session_id = %self.session_id, code, %reason, "transient upstream close, reconnect not available, terminating");
        }
        self.transition(SupervisorState::Terminated);
        true
    }

    async fn end_session(mut self) {
        self.meter.stop_audio_input();
        self.meter.stop_audio_output();
        self.metrics.update_upstream_connection_status(self.session_id.as_str(), false);

        let report = match self.meter.report(&self.rate_card) {
            Ok(r) => r,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "could not compute final cost report");
                record_error(&mut self.span, &e.to_string());
                self.span.end();
                return;
            }
        };

        let outcome = match self.exit_status.as_str() {
            "completed" => CallOutcome::Completed,
            "upstream_lost" => CallOutcome::Failed("upstream_lost"),
            "upstream_error" => CallOutcome::Failed("upstream_error"),
            _ => CallOutcome::Failed("unknown"),
        };
        self.metrics.record_call_ended(
            self.tenant_id.as_str(),
            self.agent_id.as_str(),
            outcome,
            report.duration_secs,
        );
        self.metrics.record_audio_usage(
            &report.model,
            report.audio_input.quantity,
            report.audio_output.quantity,
        );
        self.metrics.record_cost(
            &report.model,
            report.text_input.quantity as u64,
            report.text_output.quantity as u64,
            report.cached_input.quantity as u64,
            report.base,
            report.final_cost,
        );

        record_token_usage(
            &mut self.span,
            report.text_input.quantity as u64,
            report.text_output.quantity as u64,
        );
        record_call_cost(&mut self.span, report.final_cost);
        if self.exit_status == "completed" {
            record_success(&mut self.span);
        } else {
            record_error(&mut self.span, &self.exit_status);
        }
        self.span.end();

        let event = CallEndedEvent {
            session_id: self.session_id.clone(),
            tenant_id: self.tenant_id.clone(),
            agent_id: self.agent_id.clone(),
            status: self.exit_status.clone(),
            duration_seconds: report.duration_secs,
            base_cost: report.base,
            final_cost: report.final_cost,
            audio_in_seconds: report.audio_input.quantity,
            audio_out_seconds: report.audio_output.quantity,
            text_in_tokens: report.text_input.quantity as u64,
            text_out_tokens: report.text_output.quantity as u64,
            cached_tokens: report.cached_input.quantity as u64,
            model: report.model,
            timestamp: chrono::Utc::now(),
        };
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                let bus = self.bus.clone();
                let channel = self.transfer_channel.clone();
                tokio::spawn(voicebridge_bus::publish_with_retry(bus, channel, payload));
            }
            Err(e) => warn!(session_id = %self.session_id, error = %e, "failed to serialize call.ended"),
        }
        info!(session_id = %self.session_id, final_cost = report.final_cost, "session ended");
    }
}

fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_decode(s: &str) -> Option<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s).ok()
}
