//! HTTP-dispatched tools: the tool definition names an endpoint, method,
//! headers, timeout, and retry count; the dispatcher POSTs (or whatever
//! method is configured) the arguments as the body.

use crate::result::ToolResult;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;
use voicebridge_core::agent::HttpToolConfig;
use voicebridge_core::http::backoff_ms;

/// Issue the HTTP request, retrying on transport errors and 5xx responses up
/// to `config.retries` additional attempts. A non-2xx after all retries is
/// folded into `{success: false, error: ...}` rather than propagated as an
/// error: a failed tool call doesn't end the session.
///
/// `cancel` is raced against both the in-flight request and the backoff
/// sleep; when it fires the request future is dropped (cancelling it at the
/// transport layer) and the call returns an `"aborted"` result instead of
/// retrying.
pub async fn dispatch_http(
    client: &Client,
    config: &HttpToolConfig,
    arguments: &Value,
    cancel: &mut watch::Receiver<bool>,
) -> ToolResult {
    let method = config
        .method
        .parse::<reqwest::Method>()
        .unwrap_or(reqwest::Method::POST);

    let mut attempt = 0u32;
    loop {
        let mut request = client
            .request(method.clone(), &config.endpoint)
            .timeout(Duration::from_millis(config.timeout_ms))
            .json(arguments);
        for (key, value) in &config.headers {
            request = request.header(key, value);
        }

        let sent = tokio::select! {
            biased;
            _ = cancel.changed() => return ToolResult::err("aborted"),
            sent = request.send() => sent,
        };

        match sent {
            Ok(response) if response.status().is_success() => {
                let body = response.json::<Value>().await.unwrap_or(Value::Null);
                return ToolResult::ok(body);
            }
            Ok(response) if response.status().is_server_error() && attempt < config.retries => {
                warn!(
                    endpoint = %config.endpoint,
                    status = %response.status(),
                    attempt,
                    "http tool call got 5xx, retrying"
                );
            }
            Ok(response) => {
                return ToolResult::err(format!(
                    "http tool call returned {}",
                    response.status()
                ));
            }
            Err(e) if attempt < config.retries => {
                warn!(endpoint = %config.endpoint, error = %e, attempt, "http tool call transport error, retrying");
            }
            Err(e) => {
                return ToolResult::err(e.to_string());
            }
        }

        let wait = backoff_ms(attempt);
        tokio::select! {
            biased;
            _ = cancel.changed() => return ToolResult::err("aborted"),
            _ = tokio::time::sleep(Duration::from_millis(wait)) => {},
        }
        attempt += 1;
    }
}
