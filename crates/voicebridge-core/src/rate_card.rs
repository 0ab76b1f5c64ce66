//! Per-model unit costs used by the cost meter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    pub audio_input_per_sec: f64,
    pub audio_output_per_sec: f64,
    pub text_input_per_tok: f64,
    pub text_output_per_tok: f64,
    pub cached_input_per_tok: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCard {
    models: HashMap<String, ModelRates>,
    /// Process-wide fraction added on top of base cost, e.g. `0.20` for 20%.
    pub margin: f64,
}

impl RateCard {
    pub fn new(margin: f64) -> Self {
        Self {
            models: HashMap::new(),
            margin,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, rates: ModelRates) -> Self {
        self.models.insert(model.into(), rates);
        self
    }

    /// Open question #2 (spec §9): unknown models are treated as a hard
    /// configuration error rather than silently falling back to a cheaper
    /// model's rates, which would undercharge the tenant. See DESIGN.md.
    pub fn rates_for(&self, model: &str) -> Option<ModelRates> {
        self.models.get(model).copied()
    }
}

/// Default rate card seeded with the realtime models the bridge ships against.
impl Default for RateCard {
    fn default() -> Self {
        Self::new(0.20)
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
}
