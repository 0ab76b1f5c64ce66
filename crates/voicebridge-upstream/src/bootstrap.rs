//! Ephemeral-credential bootstrap: exchange the long-lived API key for a
//! short-lived token before opening the duplex connection.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use voicebridge_core::{Error, Result};

#[derive(Debug, Clone, Serialize)]
struct SessionCreateRequest<'a> {
    model: &'a str,
}

/// POST to the vendor's session-creation endpoint and pull the ephemeral
/// token out of `client_secret.value`. `AuthError` on non-success HTTP is
/// modelled as [`Error::Auth`]; a malformed success body is [`Error::Config`].
pub async fn fetch_ephemeral_token(
    client: &Client,
    bootstrap_url: &str,
    api_key: &str,
    model: &str,
) -> Result<String> {
    let response = client
        .post(bootstrap_url)
        .bearer_auth(api_key)
        .json(&SessionCreateRequest { model })
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!(
            "bootstrap POST failed with {status}: {body}"
        )));
    }

    let body: Value = response.json().await?;
    body.get("client_secret")
        .and_then(|cs| cs.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Config("bootstrap response missing client_secret.value".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn extracts_ephemeral_token_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "client_secret": {"value": "ek_abc123"}
            })))
            .mount(&server)
            .await;

        let client = Client::new();
        let token = fetch_ephemeral_token(
            &client,
            &format!("{}/sessions", server.uri()),
            "sk-test",
            "gpt-4o-realtime-preview",
        )
        .await
        .unwrap();
        assert_eq!(token, "ek_abc123");
    }

    #[tokio::test]
    async fn non_success_status_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = Client::new();
        let result = fetch_ephemeral_token(
            &client,
            &format!("{}/sessions", server.uri()),
            "sk-test",
            "gpt-4o-realtime-preview",
        )
        .await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn missing_client_secret_is_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let client = Client::new();
        let result = fetch_ephemeral_token(
            &client,
            &format!("{}/sessions", server.uri()),
            "sk-test",
            "gpt-4o-realtime-preview",
        )
        .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
