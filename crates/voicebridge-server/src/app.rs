//! Wires the long-lived pieces the telephony ingress needs: the directory,
//! the control bus, the rate card, and the tool dispatcher.

use std::sync::Arc;

use voicebridge_bus::RedisBusAdapter;
use voicebridge_core::{Error, ModelRates, RateCard};
use voicebridge_observability::Metrics;
use voicebridge_session::SupervisorRegistry;
use voicebridge_telephony::{CachedDirectory, HttpDirectory, IngressState};
use voicebridge_tools::ToolDispatcher;

use crate::config::BridgeConfig;

/// Build the rate card for the configured margin, seeded with the realtime
/// models the bridge ships against (spec §4.3).
fn build_rate_card(config: &BridgeConfig) -> RateCard {
    RateCard::new(config.margin_fraction())
        .with_model(
            "gpt-4o-realtime-preview",
            ModelRates {
                audio_input_per_sec: 0.00166,
                audio_output_per_sec: 0.00333,
                text_input_per_tok: 0.000_005,
                text_output_per_tok: 0.00002,
                cached_input_per_tok: 0.0000025,
            },
        )
        .with_model(
            "gpt-4o-mini-realtime-preview",
            ModelRates {
                audio_input_per_sec: 0.00033,
                audio_output_per_sec: 0.00067,
                text_input_per_tok: 0.0000006,
                text_output_per_tok: 0.0000024,
                cached_input_per_tok: 0.0000003,
            },
        )
}

/// Build the shared state handed to the telephony ingress router.
pub async fn build_ingress_state(
    config: &BridgeConfig,
    metrics: Arc<Metrics>,
) -> Result<Arc<IngressState>, Error> {
    let http_client = reqwest::Client::new();

    let directory = Arc::new(CachedDirectory::new(HttpDirectory::new(
        http_client.clone(),
        config.directory_url.clone(),
    )));

    let bus = Arc::new(RedisBusAdapter::connect(&config.bus_url).await?);

    let rate_card = Arc::new(build_rate_card(config));

    let dispatcher = Arc::new(ToolDispatcher::new(http_client.clone(), bus.clone()));

    Ok(Arc::new(IngressState {
        directory,
        registry: Arc::new(SupervisorRegistry::new()),
        http_client,
        bootstrap_url: config.upstream_bootstrap_url.clone(),
        ws_url: config.upstream_ws_url.clone(),
        api_key: config.upstream_api_key.clone(),
        rate_card,
        dispatcher,
        bus,
        metrics,
        vad_threshold: config.vad_threshold,
        silence_duration_ms: config.silence_duration_ms,
    }))
}
