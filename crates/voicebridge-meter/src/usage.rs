//! The usage report shape carried by an upstream `response.done` event.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenDetails {
    #[serde(default)]
    pub audio_tokens: u64,
    #[serde(default)]
    pub cached_tokens: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UsageReport {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub input_token_details: TokenDetails,
    #[serde(default)]
    pub output_token_details: TokenDetails,
}

impl UsageReport {
    /// Text (non-audio) input tokens: total minus the audio-token subset.
    pub fn text_input_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_sub(self.input_token_details.audio_tokens)
    }

    /// Text (non-audio) output tokens: total minus the audio-token subset.
    pub fn text_output_tokens(&self) -> u64 {
        self.output_tokens
            .saturating_sub(self.output_token_details.audio_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_text_from_audio_tokens() {
        let usage = UsageReport {
            input_tokens: 120,
            output_tokens: 45,
            input_token_details: TokenDetails {
                audio_tokens: 100,
                cached_tokens: 20,
            },
            output_token_details: TokenDetails {
                audio_tokens: 40,
                cached_tokens: 0,
            },
        };
        assert_eq!(usage.text_input_tokens(), 20);
        assert_eq!(usage.text_output_tokens(), 5);
    }
}
