//! OpenTelemetry distributed tracing
//!
//! This module provides utilities for distributed tracing with OpenTelemetry:
//! - Span creation and management
//! - Trace context propagation (W3C TraceContext)
//! - Attribute setting for call spans
//!
//! Note: This is a simplified implementation. For production use, consider
//! using the full tracing-opentelemetry integration.

use opentelemetry::{
    KeyValue,
    trace::{Span, Status},
};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};

/// Tracer configuration
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// Service name
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Sampling rate (0.0-1.0)
    pub sampling_rate: f64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            service_name: "voicebridge".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            sampling_rate: 1.0,
        }
    }
}

/// Initialize a tracer provider
///
/// Returns a TracerProvider that can be used to create tracers
pub fn init_tracer_provider(config: TracerConfig) -> TracerProvider {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name),
        KeyValue::new("service.version", config.service_version),
    ]);

    let sampler = if config.sampling_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if config.sampling_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.sampling_rate)
    };

    TracerProvider::builder()
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_resource(resource)
                .with_id_generator(RandomIdGenerator::default())
                .with_sampler(sampler),
        )
        .build()
}

/// Span attributes for a call bridged through the voice bridge
#[derive(Debug, Clone)]
pub struct CallSpanAttributes {
    /// Session identifier
    pub session_id: Option<String>,
    /// Tenant identifier
    pub tenant_id: Option<String>,
    /// Agent identifier
    pub agent_id: Option<String>,
    /// Upstream realtime model
    pub model: Option<String>,
    /// Caller identifier (phone number or SIP URI)
    pub caller_id: Option<String>,
}

impl CallSpanAttributes {
    /// Create a new empty attributes set
    pub fn new() -> Self {
        Self {
            session_id: None,
            tenant_id: None,
            agent_id: None,
            model: None,
            caller_id: None,
        }
    }

    /// Set the session id
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the tenant id
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the agent id
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the upstream model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the caller id
    pub fn with_caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    /// Convert to OpenTelemetry KeyValue pairs
    pub fn to_key_values(&self) -> Vec<KeyValue> {
        let mut kvs = Vec::new();

        if let Some(ref session_id) = self.session_id {
            kvs.push(KeyValue::new("voicebridge.session_id", session_id.clone()));
        }
        if let Some(ref tenant_id) = self.tenant_id {
            kvs.push(KeyValue::new("voicebridge.tenant_id", tenant_id.clone()));
        }
        if let Some(ref agent_id) = self.agent_id {
            kvs.push(KeyValue::new("voicebridge.agent_id", agent_id.clone()));
        }
        if let Some(ref model) = self.model {
            kvs.push(KeyValue::new("llm.model", model.clone()));
        }
        if let Some(ref caller_id) = self.caller_id {
            kvs.push(KeyValue::new("voicebridge.caller_id", caller_id.clone()));
        }

        kvs
    }
}

impl Default for CallSpanAttributes {
    fn default() -> Self {
        Self::new()
    }
}

/// Add token usage attributes to a span
pub fn record_token_usage(span: &mut impl Span, input_tokens: u64, output_tokens: u64) {
    span.set_attribute(KeyValue::new("llm.usage.input_tokens", input_tokens as i64));
    span.set_attribute(KeyValue::new("llm.usage.output_tokens", output_tokens as i64));
    span.set_attribute(KeyValue::new(
        "llm.usage.total_tokens",
        (input_tokens + output_tokens) as i64,
    ));
}

/// Add a final cost attribute to a span
pub fn record_call_cost(span: &mut impl Span, final_cost_usd: f64) {
    span.set_attribute(KeyValue::new("voicebridge.cost.final_usd", final_cost_usd));
}

/// Mark a span as failed with an error
pub fn record_error(span: &mut impl Span, error: &str) {
    span.set_status(Status::error(error.to_string()));
    span.set_attribute(KeyValue::new("error", true));
    span.set_attribute(KeyValue::new("error.message", error.to_string()));
}

/// Mark a span as successful
pub fn record_success(span: &mut impl Span) {
    span.set_status(Status::Ok);
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{Tracer, TracerProvider};

    #[test]
    fn test_tracer_config_default() {
        let config = TracerConfig::default();
        assert_eq!(config.service_name, "voicebridge");
        assert_eq!(config.sampling_rate, 1.0);
    }

    #[test]
    fn test_init_tracer_provider() {
        let config = TracerConfig::default();
        let provider = init_tracer_provider(config);
        let tracer = provider.tracer("test");
        let span = tracer.start("test_span");
        assert!(!span.span_context().trace_id().to_string().is_empty());
    }

    #[test]
    fn test_call_span_attributes() {
        let attrs = CallSpanAttributes::new()
            .with_session_id("sess-123")
            .with_tenant_id("tenant-a")
            .with_agent_id("agent-1")
            .with_model("gpt-4o-realtime-preview")
            .with_caller_id("+15551234567");

        let kvs = attrs.to_key_values();
        assert_eq!(kvs.len(), 5);

        assert!(
            kvs.iter()
                .any(|kv| kv.key.as_str() == "voicebridge.session_id" && kv.value.as_str() == "sess-123")
        );
        assert!(
            kvs.iter()
                .any(|kv| kv.key.as_str() == "llm.model" && kv.value.as_str() == "gpt-4o-realtime-preview")
        );
    }

    #[test]
    fn test_call_span_attributes_partial() {
        let attrs = CallSpanAttributes::new().with_model("gpt-4o-realtime-preview");

        let kvs = attrs.to_key_values();
        assert_eq!(kvs.len(), 1);
        assert_eq!(kvs[0].key.as_str(), "llm.model");
    }

    #[test]
    fn test_record_token_usage() {
        let config = TracerConfig::default();
        let provider = init_tracer_provider(config);
        let tracer = provider.tracer("test");
        let mut span = tracer.start("test_span");

        record_token_usage(&mut span, 100, 50);

        // Span is updated with attributes (no way to read them in tests without export)
        // Just verify no panic
    }

    #[test]
    fn test_record_call_cost() {
        let config = TracerConfig::default();
        let provider = init_tracer_provider(config);
        let tracer = provider.tracer("test");
        let mut span = tracer.start("test_span");

        record_call_cost(&mut span, 0.042);
    }

    #[test]
    fn test_record_error() {
        let config = TracerConfig::default();
        let provider = init_tracer_provider(config);
        let tracer = provider.tracer("test");
        let mut span = tracer.start("test_span");

        record_error(&mut span, "test error");

        // Span is updated with error status (no way to read it in tests without export)
        // Just verify no panic
    }

    #[test]
    fn test_record_success() {
        let config = TracerConfig::default();
        let provider = init_tracer_provider(config);
        let tracer = provider.tracer("test");
        let mut span = tracer.start("test_span");

        record_success(&mut span);

        // Span is updated with OK status (no way to read it in tests without export)
        // Just verify no panic
    }

    #[test]
    fn test_tracer_config_custom() {
        let config = TracerConfig {
            service_name: "custom-service".to_string(),
            service_version: "1.0.0".to_string(),
            sampling_rate: 0.5,
        };

        assert_eq!(config.service_name, "custom-service");
        assert_eq!(config.service_version, "1.0.0");
        assert_eq!(config.sampling_rate, 0.5);
    }

    #[test]
    fn test_sampling_always_on() {
        let config = TracerConfig {
            service_name: "test".to_string(),
            service_version: "1.0.0".to_string(),
            sampling_rate: 1.0,
        };

        let provider = init_tracer_provider(config);
        let tracer = provider.tracer("test");
        let span = tracer.start("test_span");
        assert!(!span.span_context().trace_id().to_string().is_empty());
    }

    #[test]
    fn test_sampling_always_off() {
        let config = TracerConfig {
            service_name: "test".to_string(),
            service_version: "1.0.0".to_string(),
            sampling_rate: 0.0,
        };

        let provider = init_tracer_provider(config);
        let tracer = provider.tracer("test");
        let span = tracer.start("test_span");
        // Even with AlwaysOff sampler, span is created but not sampled
        assert!(!span.span_context().trace_id().to_string().is_empty());
    }
}
