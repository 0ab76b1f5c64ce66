//! Voice bridge observability
//!
//! This crate provides observability features:
//! - Metrics collection (Prometheus)
//! - Distributed tracing (OpenTelemetry)
//! - Structured logging
//! - Health endpoints

pub mod health;
pub mod metrics;
pub mod tracing;

pub use health::{health_router, DependencyStatus, HealthResponse, HealthState, ReadinessChecker, ReadinessResponse};
pub use metrics::{CallOutcome, Metrics};
pub use tracing::{
    init_tracer_provider, record_call_cost, record_error, record_success, record_token_usage,
    CallSpanAttributes, TracerConfig,
};
