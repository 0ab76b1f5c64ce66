//! Shared types and traits for the realtime voice bridge.
//!
//! - [`ids`]: opaque string identifiers (session, caller, tenant, agent)
//! - [`agent`]: immutable per-session agent configuration and tool definitions
//! - [`rate_card`]: per-model unit costs used by the cost meter
//! - [`error`]: bridge-wide error taxonomy
//! - [`http`]: shared HTTP client/retry helper used by bootstrap and tool dispatch

pub mod agent;
pub mod error;
pub mod http;
pub mod ids;
pub mod rate_card;

pub use agent::{AgentConfig, DispatchKind, HttpToolConfig, ToolDefinition, TransferConfig};
pub use error::{Error, Result};
pub use ids::{AgentId, CallerId, SessionId, TenantId};
pub use rate_card::{ModelRates, RateCard};
