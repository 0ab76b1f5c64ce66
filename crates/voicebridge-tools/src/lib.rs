//! Tool dispatch: turns upstream `function.call` events into structured
//! results, whether handled inline (call-transfer) or proxied over HTTP.
//!
//! - [`dispatcher`]: [`ToolDispatcher`], the entry point
//! - [`inline`]: the call-transfer tool
//! - [`http_tool`]: HTTP-dispatched tools with retry/backoff
//! - [`result`]: the structured [`ToolResult`] every dispatch produces

pub mod dispatcher;
pub mod http_tool;
pub mod inline;
pub mod result;

pub use dispatcher::{ToolCall, ToolDispatcher};
pub use inline::TransferContext;
pub use result::ToolResult;
