//! Per-session usage accumulator and cost computation.

use crate::report::{CostAxis, CostReport};
use crate::usage::UsageReport;
use chrono::Utc;
use std::time::Instant;
use voicebridge_core::{Error, RateCard, Result, SessionId};

/// Accumulates audio-second and token usage for one call. `start`/`stop`
/// pairs are idempotent bracketing, not a stack: only one input span and one
/// output span can be open at a time.
#[derive(Debug)]
pub struct MeterState {
    session_id: SessionId,
    model: String,
    audio_in_seconds: f64,
    audio_out_seconds: f64,
    text_in_tokens: u64,
    text_out_tokens: u64,
    cached_tokens: u64,
    input_start: Option<Instant>,
    output_start: Option<Instant>,
    opened_at: chrono::DateTime<Utc>,
}

impl MeterState {
    pub fn new(session_id: SessionId, model: impl Into<String>) -> Self {
        Self {
            session_id,
            model: model.into(),
            audio_in_seconds: 0.0,
            audio_out_seconds: 0.0,
            text_in_tokens: 0,
            text_out_tokens: 0,
            cached_tokens: 0,
            input_start: None,
            output_start: None,
            opened_at: Utc::now(),
        }
    }

    /// No-op if a span is already open.
    pub fn start_audio_input(&mut self) {
        if self.input_start.is_none() {
            self.input_start = Some(Instant::now());
        }
    }

    /// No-op if no span is open. Accumulates elapsed seconds into
    /// `audio_in_seconds`.
    pub fn stop_audio_input(&mut self) {
        if let Some(start) = self.input_start.take() {
            self.audio_in_seconds += start.elapsed().as_secs_f64();
        }
    }

    pub fn start_audio_output(&mut self) {
        if self.output_start.is_none() {
            self.output_start = Some(Instant::now());
        }
    }

    pub fn stop_audio_output(&mut self) {
        if let Some(start) = self.output_start.take() {
            self.audio_out_seconds += start.elapsed().as_secs_f64();
        }
    }

    /// Absorb a usage report from an upstream `response.done` event. Text
    /// token counts are derived as total minus the audio-token subset;
    /// counters are monotonically non-decreasing.
    pub fn record_usage(&mut self, usage: &UsageReport) {
        self.text_in_tokens += usage.text_input_tokens();
        self.text_out_tokens += usage.text_output_tokens();
        self.cached_tokens += usage.input_token_details.cached_tokens;
    }

    pub fn audio_in_seconds(&self) -> f64 {
        self.audio_in_seconds
    }

    pub fn audio_out_seconds(&self) -> f64 {
        self.audio_out_seconds
    }

    pub fn text_in_tokens(&self) -> u64 {
        self.text_in_tokens
    }

    pub fn text_out_tokens(&self) -> u64 {
        self.text_out_tokens
    }

    pub fn cached_tokens(&self) -> u64 {
        self.cached_tokens
    }

    /// Compute the cost report for the usage accumulated so far. Does not
    /// close any open spans or reset state; callers that want a final report
    /// should stop both spans first.
    pub fn report(&self, rate_card: &RateCard) -> Result<CostReport> {
        let rates = rate_card.rates_for(&self.model).ok_or_else(|| {
            Error::Config(format!(
                "no rate card entry for model '{}': refusing to guess a substitute rate",
                self.model
            ))
        })?;

        let audio_input = CostAxis::new(self.audio_in_seconds, rates.audio_input_per_sec);
        let audio_output = CostAxis::new(self.audio_out_seconds, rates.audio_output_per_sec);
        let text_input = CostAxis::new(self.text_in_tokens as f64, rates.text_input_per_tok);
        let text_output = CostAxis::new(self.text_out_tokens as f64, rates.text_output_per_tok);
        let cached_input = CostAxis::new(self.cached_tokens as f64, rates.cached_input_per_tok);

        let base = audio_input.contribution
            + audio_output.contribution
            + text_input.contribution
            + text_output.contribution
            + cached_input.contribution;
        let margin_amount = base * rate_card.margin;
        let final_cost = base + margin_amount;

        let duration_secs = (Utc::now() - self.opened_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let (cost_per_minute, cost_per_hour) = if duration_secs > 0.0 {
            let per_second = final_cost / duration_secs;
            (per_second * 60.0, per_second * 3_600.0)
        } else {
            (0.0, 0.0)
        };

        Ok(CostReport {
            session_id: self.session_id.clone(),
            model: self.model.clone(),
            duration_secs,
            audio_input,
            audio_output,
            text_input,
            text_output,
            cached_input,
            base,
            margin: rate_card.margin,
            margin_amount,
            final_cost,
            cost_per_minute,
            cost_per_hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicebridge_core::rate_card::ModelRates;

    fn test_rate_card() -> RateCard {
        RateCard::new(0.20).with_model(
            "test-model",
            ModelRates {
                audio_input_per_sec: 1.0,
                audio_output_per_sec: 2.0,
                text_input_per_tok: 0.01,
                text_output_per_tok: 0.02,
                cached_input_per_tok: 0.001,
            },
        )
    }

    #[test]
    fn start_stop_audio_input_is_idempotent_and_accumulates() {
        let mut meter = MeterState::new(SessionId::generate(), "test-model");
        meter.start_audio_input();
        meter.start_audio_input(); // no-op, span already open
        std::thread::sleep(std::time::Duration::from_millis(10));
        meter.stop_audio_input();
        meter.stop_audio_input(); // no-op, span already closed
        assert!(meter.audio_in_seconds() > 0.0);
        let after_first_stop = meter.audio_in_seconds();
        meter.stop_audio_input();
        assert_eq!(meter.audio_in_seconds(), after_first_stop);
    }

    #[test]
    fn record_usage_splits_text_and_cached_tokens() {
        let mut meter = MeterState::new(SessionId::generate(), "test-model");
        meter.record_usage(&UsageReport {
            input_tokens: 120,
            output_tokens: 45,
            input_token_details: crate::usage::TokenDetails {
                audio_tokens: 100,
                cached_tokens: 20,
            },
            output_token_details: crate::usage::TokenDetails {
                audio_tokens: 40,
                cached_tokens: 0,
            },
        });
        assert_eq!(meter.text_in_tokens(), 20);
        assert_eq!(meter.text_out_tokens(), 5);
        assert_eq!(meter.cached_tokens(), 20);
    }

    #[test]
    fn unknown_model_report_is_a_config_error() {
        let meter = MeterState::new(SessionId::generate(), "no-such-model");
        let card = test_rate_card();
        assert!(meter.report(&card).is_err());
    }

    #[test]
    fn final_cost_equals_base_plus_margin_amount() {
        let mut meter = MeterState::new(SessionId::generate(), "test-model");
        meter.record_usage(&UsageReport {
            input_tokens: 100,
            output_tokens: 50,
            input_token_details: crate::usage::TokenDetails {
                audio_tokens: 0,
                cached_tokens: 0,
            },
            output_token_details: crate::usage::TokenDetails {
                audio_tokens: 0,
                cached_tokens: 0,
            },
        });
        let report = meter.report(&test_rate_card()).unwrap();
        assert!((report.final_cost - (report.base + report.margin_amount)).abs() < 1e-9);
        assert!(report.base >= 0.0);
        assert!((report.base - (1.0 * 100.0 * 0.01 + 50.0 * 0.02)).abs() < 1e-9);
    }
}
