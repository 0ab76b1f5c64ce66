//! Duplex client for the upstream realtime speech-to-speech LLM service:
//! ephemeral-credential bootstrap followed by a typed, event-emitting
//! WebSocket session.
//!
//! - [`bootstrap`]: HTTP POST exchanging the long-lived API key for an
//!   ephemeral token
//! - [`client`]: [`UpstreamClient`], the duplex session
//! - [`messages`]: outbound/inbound wire shapes and the typed [`UpstreamEvent`]

pub mod bootstrap;
pub mod client;
pub mod messages;

pub use bootstrap::fetch_ephemeral_token;
pub use client::UpstreamClient;
pub use messages::{FunctionCallOutputItem, OutboundMessage, SessionUpdatePayload, UpstreamEvent};
