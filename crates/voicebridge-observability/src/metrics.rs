//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for the voice bridge:
//! - Call counts (started, completed, failed by tenant and agent)
//! - Call duration histograms and an active-call gauge
//! - Token and audio usage, and the resulting billed cost
//! - Tool dispatch counters
//! - Upstream connection health

use prometheus::{CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for the voice bridge
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    // Call counters
    /// Total calls accepted
    pub calls_total: CounterVec,
    /// Calls that completed normally
    pub calls_completed: CounterVec,
    /// Calls that ended in failure (bootstrap, connect, or mid-call)
    pub calls_failed: CounterVec,

    // Call duration / gauges
    /// Whole-call duration in seconds
    pub call_duration_seconds: HistogramVec,
    /// Calls currently in progress
    pub active_calls: Gauge,
    /// Sessions torn down by the idle reaper
    pub sessions_reaped: CounterVec,

    // Audio usage
    /// Seconds of caller audio sent upstream
    pub audio_input_seconds: CounterVec,
    /// Seconds of synthesized audio returned to the caller
    pub audio_output_seconds: CounterVec,

    // Token / cost metrics
    /// Text input tokens billed
    pub tokens_input: CounterVec,
    /// Text output tokens billed
    pub tokens_output: CounterVec,
    /// Cached input tokens billed
    pub tokens_cached: CounterVec,
    /// Base cost before margin, in dollars
    pub cost_base_usd: CounterVec,
    /// Final billed cost including margin, in dollars
    pub cost_billed_usd: CounterVec,

    // Tool dispatch metrics
    /// Tool invocations by tool name
    pub tool_calls_total: CounterVec,
    /// Tool invocations that returned an error result
    pub tool_call_failures: CounterVec,

    // Upstream connection metrics
    /// Upstream bootstrap/connect failures by reason
    pub upstream_connect_failures: CounterVec,
    /// Upstream connection status (0=disconnected, 1=connected)
    pub upstream_connection_status: GaugeVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let calls_total = CounterVec::new(
            Opts::new("voicebridge_calls_total", "Total number of calls accepted"),
            &["tenant_id", "agent_id"],
        )?;

        let calls_completed = CounterVec::new(
            Opts::new(
                "voicebridge_calls_completed_total",
                "Total number of calls that ended normally",
            ),
            &["tenant_id", "agent_id"],
        )?;

        let calls_failed = CounterVec::new(
            Opts::new(
                "voicebridge_calls_failed_total",
                "Total number of calls that ended in failure",
            ),
            &["tenant_id", "agent_id", "reason"],
        )?;

        let call_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "voicebridge_call_duration_seconds",
                "Whole-call duration in seconds",
            )
            .buckets(vec![
                1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
            ]),
            &["tenant_id", "agent_id"],
        )?;

        let active_calls = Gauge::new(
            "voicebridge_active_calls",
            "Number of calls currently bridged",
        )?;

        let sessions_reaped = CounterVec::new(
            Opts::new(
                "voicebridge_sessions_reaped_total",
                "Sessions torn down by the idle reaper",
            ),
            &["tenant_id"],
        )?;

        let audio_input_seconds = CounterVec::new(
            Opts::new(
                "voicebridge_audio_input_seconds_total",
                "Seconds of caller audio sent upstream",
            ),
            &["model"],
        )?;

        let audio_output_seconds = CounterVec::new(
            Opts::new(
                "voicebridge_audio_output_seconds_total",
                "Seconds of synthesized audio returned to the caller",
            ),
            &["model"],
        )?;

        let tokens_input = CounterVec::new(
            Opts::new("voicebridge_tokens_input_total", "Total text input tokens billed"),
            &["model"],
        )?;

        let tokens_output = CounterVec::new(
            Opts::new(
                "voicebridge_tokens_output_total",
                "Total text output tokens billed",
            ),
            &["model"],
        )?;

        let tokens_cached = CounterVec::new(
            Opts::new(
                "voicebridge_tokens_cached_total",
                "Total cached input tokens billed",
            ),
            &["model"],
        )?;

        let cost_base_usd = CounterVec::new(
            Opts::new(
                "voicebridge_cost_base_usd_total",
                "Base cost accrued before margin, in dollars",
            ),
            &["model"],
        )?;

        let cost_billed_usd = CounterVec::new(
            Opts::new(
                "voicebridge_cost_billed_usd_total",
                "Final billed cost including margin, in dollars",
            ),
            &["model"],
        )?;

        let tool_calls_total = CounterVec::new(
            Opts::new("voicebridge_tool_calls_total", "Total tool invocations"),
            &["tool"],
        )?;

        let tool_call_failures = CounterVec::new(
            Opts::new(
                "voicebridge_tool_call_failures_total",
                "Tool invocations that returned an error result",
            ),
            &["tool"],
        )?;

        let upstream_connect_failures = CounterVec::new(
            Opts::new(
                "voicebridge_upstream_connect_failures_total",
                "Upstream bootstrap/connect failures",
            ),
            &["reason"],
        )?;

        let upstream_connection_status = GaugeVec::new(
            Opts::new(
                "voicebridge_upstream_connection_status",
                "Upstream connection status (0=disconnected, 1=connected)",
            ),
            &["session_id"],
        )?;

        registry.register(Box::new(calls_total.clone()))?;
        registry.register(Box::new(calls_completed.clone()))?;
        registry.register(Box::new(calls_failed.clone()))?;
        registry.register(Box::new(call_duration_seconds.clone()))?;
        registry.register(Box::new(active_calls.clone()))?;
        registry.register(Box::new(sessions_reaped.clone()))?;
        registry.register(Box::new(audio_input_seconds.clone()))?;
        registry.register(Box::new(audio_output_seconds.clone()))?;
        registry.register(Box::new(tokens_input.clone()))?;
        registry.register(Box::new(tokens_output.clone()))?;
        registry.register(Box::new(tokens_cached.clone()))?;
        registry.register(Box::new(cost_base_usd.clone()))?;
        registry.register(Box::new(cost_billed_usd.clone()))?;
        registry.register(Box::new(tool_calls_total.clone()))?;
        registry.register(Box::new(tool_call_failures.clone()))?;
        registry.register(Box::new(upstream_connect_failures.clone()))?;
        registry.register(Box::new(upstream_connection_status.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            calls_total,
            calls_completed,
            calls_failed,
            call_duration_seconds,
            active_calls,
            sessions_reaped,
            audio_input_seconds,
            audio_output_seconds,
            tokens_input,
            tokens_output,
            tokens_cached,
            cost_base_usd,
            cost_billed_usd,
            tool_calls_total,
            tool_call_failures,
            upstream_connect_failures,
            upstream_connection_status,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a call being accepted and bridged
    pub fn record_call_started(&self, tenant_id: &str, agent_id: &str) {
        self.calls_total.with_label_values(&[tenant_id, agent_id]).inc();
        self.active_calls.inc();
    }

    /// Record a call ending, successfully or not, releasing the active slot
    pub fn record_call_ended(
        &self,
        tenant_id: &str,
        agent_id: &str,
        status: CallOutcome,
        duration_secs: f64,
    ) {
        self.active_calls.dec();
        self.call_duration_seconds
            .with_label_values(&[tenant_id, agent_id])
            .observe(duration_secs);
        match status {
            CallOutcome::Completed => {
                self.calls_completed.with_label_values(&[tenant_id, agent_id]).inc();
            }
            CallOutcome::Failed(reason) => {
                self.calls_failed
                    .with_label_values(&[tenant_id, agent_id, reason])
                    .inc();
            }
        }
    }

    /// Record a session torn down by the idle reaper
    pub fn record_session_reaped(&self, tenant_id: &str) {
        self.sessions_reaped.with_label_values(&[tenant_id]).inc();
    }

    /// Record audio usage accrued during a call
    pub fn record_audio_usage(&self, model: &str, input_secs: f64, output_secs: f64) {
        self.audio_input_seconds.with_label_values(&[model]).inc_by(input_secs);
        self.audio_output_seconds.with_label_values(&[model]).inc_by(output_secs);
    }

    /// Record token usage and the resulting cost. Callers pass the already
    /// computed totals rather than this crate depending on the meter crate's
    /// report type.
    #[allow(clippy::too_many_arguments)]
    pub fn record_cost(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cached_tokens: u64,
        base_usd: f64,
        billed_usd: f64,
    ) {
        self.tokens_input.with_label_values(&[model]).inc_by(input_tokens as f64);
        self.tokens_output.with_label_values(&[model]).inc_by(output_tokens as f64);
        self.tokens_cached.with_label_values(&[model]).inc_by(cached_tokens as f64);
        self.cost_base_usd.with_label_values(&[model]).inc_by(base_usd);
        self.cost_billed_usd.with_label_values(&[model]).inc_by(billed_usd);
    }

    /// Record a tool dispatch outcome
    pub fn record_tool_call(&self, tool: &str, succeeded: bool) {
        self.tool_calls_total.with_label_values(&[tool]).inc();
        if !succeeded {
            self.tool_call_failures.with_label_values(&[tool]).inc();
        }
    }

    /// Record a failure to bootstrap or connect to the upstream session
    pub fn record_upstream_connect_failure(&self, reason: &str) {
        self.upstream_connect_failures.with_label_values(&[reason]).inc();
    }

    /// Update whether a given session currently has a live upstream connection
    pub fn update_upstream_connection_status(&self, session_id: &str, connected: bool) {
        self.upstream_connection_status
            .with_label_values(&[session_id])
            .set(if connected { 1.0 } else { 0.0 });
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to create metrics")
    }
}

/// Outcome of a completed call, for [`Metrics::record_call_ended`]
#[derive(Debug, Clone, Copy)]
pub enum CallOutcome {
    Completed,
    Failed(&'static str),
}
