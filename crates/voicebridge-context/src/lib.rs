//! Per-session memory of tool outcomes, woven back into the LLM's
//! instructions so subsequent turns reflect prior tool actions.

pub mod buffer;

pub use buffer::{ContextBuffer, ContextEntry};
