//! Caller/tenant/agent resolution: a pluggable external collaborator the
//! ingress consults once per new call.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use voicebridge_core::{AgentConfig, AgentId, CallerId, Error, Result, TenantId};

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub agent_config: Arc<AgentConfig>,
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn resolve(&self, caller_id: &CallerId, port: Option<u16>) -> Result<DirectoryEntry>;
}

/// Resolves against an HTTP directory service: `GET {base_url}/resolve?caller=...&port=...`.
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn resolve(&self, caller_id: &CallerId, port: Option<u16>) -> Result<DirectoryEntry> {
        let mut request = self
            .client
            .get(format!("{}/resolve", self.base_url))
            .query(&[("caller", caller_id.as_str())]);
        if let Some(port) = port {
            request = request.query(&[("port", port.to_string())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("directory lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Config(format!(
                "directory lookup for '{caller_id}' returned status {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;

        let tenant_id = body
            .get("tenant_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Config("directory response missing tenant_id".to_string()))?
            .into();
        let agent_id = body
            .get("agent_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Config("directory response missing agent_id".to_string()))?
            .into();
        let agent_config: AgentConfig = serde_json::from_value(
            body.get("agent_config")
                .cloned()
                .ok_or_else(|| Error::Config("directory response missing agent_config".to_string()))?,
        )
        .map_err(|e| Error::Config(format!("malformed agent_config: {e}")))?;

        Ok(DirectoryEntry {
            tenant_id,
            agent_id,
            agent_config: Arc::new(agent_config),
        })
    }
}

/// Read-mostly cache in front of any [`Directory`]: a cache hit never
/// touches the inner directory; a miss resolves once and replaces the slot
/// atomically for subsequent lookups.
pub struct CachedDirectory<D> {
    inner: D,
    cache: DashMap<(CallerId, Option<u16>), Arc<DirectoryEntry>>,
}

impl<D: Directory> CachedDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl<D: Directory> Directory for CachedDirectory<D> {
    async fn resolve(&self, caller_id: &CallerId, port: Option<u16>) -> Result<DirectoryEntry> {
        let key = (caller_id.clone(), port);
        if let Some(entry) = self.cache.get(&key) {
            return Ok((**entry).clone());
        }
        let entry = Arc::new(self.inner.resolve(caller_id, port).await?);
        self.cache.insert(key, entry.clone());
        Ok((*entry).clone())
    }
}
