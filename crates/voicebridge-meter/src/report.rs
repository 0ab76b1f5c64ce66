//! The structured cost report returned by [`crate::MeterState::report`].

use serde::Serialize;
use voicebridge_core::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostAxis {
    pub quantity: f64,
    pub unit_rate: f64,
    pub contribution: f64,
}

impl CostAxis {
    pub(crate) fn new(quantity: f64, unit_rate: f64) -> Self {
        Self {
            quantity,
            unit_rate,
            contribution: quantity * unit_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub session_id: SessionId,
    pub model: String,
    pub duration_secs: f64,
    pub audio_input: CostAxis,
    pub audio_output: CostAxis,
    pub text_input: CostAxis,
    pub text_output: CostAxis,
    pub cached_input: CostAxis,
    pub base: f64,
    pub margin: f64,
    pub margin_amount: f64,
    pub final_cost: f64,
    pub cost_per_minute: f64,
    pub cost_per_hour: f64,
}
