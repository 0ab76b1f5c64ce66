//! Audio transcoding between telephony mu-law (8 kHz) and the upstream
//! realtime service's linear PCM16 (24 kHz).
//!
//! - [`mulaw`]: ITU-T G.711 mu-law encode/decode
//! - [`resample`]: fixed-ratio resampling (8 <-> 16 <-> 24 kHz)

pub mod mulaw;
pub mod resample;

pub use mulaw::{decode as mulaw_decode, encode as mulaw_encode};
pub use resample::{
    downsample_16_to_8, downsample_24_to_8, upsample_16_to_24, upsample_8_to_16, upsample_8_to_24,
};

/// Parse little-endian PCM16 bytes into samples. An odd trailing byte is
/// dropped rather than raising: malformed input is truncated to the largest
/// even prefix, never rejected.
pub fn pcm16_le_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Serialize samples to little-endian PCM16 bytes.
pub fn samples_to_pcm16_le(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Convert a telephony mu-law frame (8 kHz) to upstream PCM16 bytes (24 kHz).
pub fn telephony_frame_to_upstream_pcm(mulaw_bytes: &[u8]) -> Vec<u8> {
    let samples_8k = mulaw::decode(mulaw_bytes);
    let samples_24k = resample::upsample_8_to_24(&samples_8k);
    samples_to_pcm16_le(&samples_24k)
}

/// Convert upstream PCM16 bytes (24 kHz) back to a telephony mu-law frame
/// (8 kHz). Any odd trailing byte in `pcm_bytes` is dropped.
pub fn upstream_pcm_to_telephony_frame(pcm_bytes: &[u8]) -> Vec<u8> {
    let samples_24k = pcm16_le_to_samples(pcm_bytes);
    let samples_8k = resample::downsample_24_to_8(&samples_24k);
    mulaw::encode(&samples_8k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_round_trips_through_bytes() {
        let samples = [0i16, -1, 32767, -32768, 12345];
        let bytes = samples_to_pcm16_le(&samples);
        assert_eq!(pcm16_le_to_samples(&bytes), samples);
    }

    #[test]
    fn pcm16_le_to_samples_truncates_odd_trailing_byte() {
        let bytes = [0u8, 0, 1, 0, 0xFF];
        let samples = pcm16_le_to_samples(&bytes);
        assert_eq!(samples, vec![0, 1]);
    }

    #[test]
    fn telephony_frame_round_trips_through_upstream_pcm() {
        let frame: Vec<u8> = (0u8..160).collect();
        let pcm = telephony_frame_to_upstream_pcm(&frame);
        assert_eq!(pcm.len(), 160 * 3 * 2); // 8k -> 24k samples, 2 bytes each
        let back = upstream_pcm_to_telephony_frame(&pcm);
        assert_eq!(back.len(), frame.len());
    }
}
