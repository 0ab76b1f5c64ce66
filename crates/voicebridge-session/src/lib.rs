//! The Session Supervisor: one task per call, owning the state machine that
//! drives audio bridging, upstream event handling, tool dispatch, and cost
//! accounting from `session.created` through termination.
//!
//! - [`state`]: `SupervisorState`, the call-lifecycle state machine
//! - [`supervisor`]: `SessionSupervisor`, the per-call task and its run loop
//! - [`registry`]: `SupervisorRegistry`, live-session tracking for the reaper
//! - [`reaper`]: the idle sweep that terminates calls past the timeout

pub mod reaper;
pub mod registry;
pub mod state;
pub mod supervisor;

pub use reaper::Reaper;
pub use registry::SupervisorRegistry;
pub use state::SupervisorState;
pub use supervisor::{OutboundAudioFrame, SessionSupervisor, SupervisorHandle};
