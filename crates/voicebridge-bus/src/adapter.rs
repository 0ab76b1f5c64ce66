//! Publish/subscribe client for cross-process signalling: transfer requests
//! and call-lifecycle events, consumed by whatever collector or telephony
//! control plane is downstream.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};
use voicebridge_core::http::{backoff_ms, with_retry};
use voicebridge_core::{Error, Result};

/// Invoked once per successfully parsed JSON message. Messages that fail to
/// parse are logged and discarded before reaching a handler.
pub type BusHandler = Arc<dyn Fn(Value) + Send + Sync>;

#[async_trait]
pub trait ControlBusAdapter: Send + Sync {
    /// Fire-and-forget delivery of a JSON-serialised event. Errors here are
    /// non-fatal for audio flow but fatal for the tool call that published.
    async fn publish_event(&self, channel: &str, event: &(impl Serialize + Sync)) -> Result<()> {
        let payload = serde_json::to_vec(event)?;
        self.publish(channel, &payload).await
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<()>;

    /// Subscribes in the background; reconnects automatically with
    /// exponential backoff and resubscribes on reconnect. Returns once the
    /// subscription has been established (or failed without hope of
    /// retry — subscribe itself never gives up, so this only returns an
    /// error if the background task could not even be started).
    async fn subscribe(&self, channel: &str, handler: BusHandler) -> Result<()>;
}

/// Redis-backed implementation: `PUBLISH`/`SUBSCRIBE` over a single logical
/// connection, matching the spec's "all publishes are serialised by the bus
/// client" shared-resource note.
pub struct RedisBusAdapter {
    client: redis::Client,
    manager: ConnectionManager,
}

impl RedisBusAdapter {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Config(format!("invalid bus url: {e}")))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::Bus(format!("initial bus connection failed: {e}")))?;
        Ok(Self { client, manager })
    }
}

#[async_trait]
impl ControlBusAdapter for RedisBusAdapter {
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| Error::Bus(format!("publish to '{channel}' failed: {e}")))
    }

    async fn subscribe(&self, channel: &str, handler: BusHandler) -> Result<()> {
        let client = self.client.clone();
        let channel = channel.to_string();
        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                match run_subscription(&client, &channel, &handler).await {
                    Ok(()) => {
                        debug!(%channel, "bus subscription ended cleanly");
                        attempt = 0;
                    }
                    Err(e) => {
                        warn!(%channel, error = %e, attempt, "bus subscription dropped, reconnecting");
                    }
                }
                let wait = backoff_ms(attempt);
                tokio::time::sleep(std::time::Duration::from_millis(wait)).await;
                attempt = attempt.saturating_add(1);
            }
        });
        Ok(())
    }
}

/// Publishes `payload` to `channel`, retrying on failure with the shared
/// backoff schedule. Drops the event and logs a warning after exhausting
/// retries rather than propagating — callers that can't afford to block on
/// bus delivery should spawn this rather than await it inline.
pub async fn publish_with_retry(bus: Arc<dyn ControlBusAdapter>, channel: String, payload: Vec<u8>) {
    let result = with_retry(2, |r: &Result<()>| r.is_err(), || {
        let bus = bus.clone();
        let channel = channel.clone();
        let payload = payload.clone();
        async move { bus.publish(&channel, &payload).await }
    })
    .await;

    if let Err(e) = result {
        warn!(%channel, error = %e, "dropping event after exhausting publish retries");
    }
}

async fn run_subscription(
    client: &redis::Client,
    channel: &str,
    handler: &BusHandler,
) -> Result<()> {
    use futures::StreamExt;

    let mut pubsub = client
        .get_async_pubsub()
        .await
        .map_err(|e| Error::Bus(format!("pubsub connect failed: {e}")))?;
    pubsub
        .subscribe(channel)
        .await
        .map_err(|e| Error::Bus(format!("subscribe to '{channel}' failed: {e}")))?;

    debug!(%channel, "subscribed to bus channel");
    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: Vec<u8> = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "bus message had no readable payload");
                continue;
            }
        };
        match serde_json::from_slice::<Value>(&payload) {
            Ok(value) => handler(value),
            Err(e) => error!(error = %e, "discarding unparseable bus message"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_used_for_reconnect_schedule() {
        assert_eq!(backoff_ms(0), 100);
        assert!(backoff_ms(20) <= 2_000);
    }
}
