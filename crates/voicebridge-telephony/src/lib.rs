//! Telephony ingress: accepts one audio framing session per call, decodes
//! companded audio to linear PCM, and routes it to the Session Supervisor
//! that owns the call.
//!
//! - [`frame`]: the wire-sized telephony audio unit
//! - [`directory`]: pluggable, cached caller/tenant/agent resolution
//! - [`ingress`]: the WebSocket handler that bridges a call end to end

pub mod directory;
pub mod frame;
pub mod ingress;

pub use directory::{CachedDirectory, Directory, DirectoryEntry, HttpDirectory};
pub use frame::{TelephonyFrame, FRAME_BYTES, FRAME_DURATION_MS};
pub use ingress::{router, IngressState};
