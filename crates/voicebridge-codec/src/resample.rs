//! Fixed-ratio linear resampling between the telephony rate (8 kHz) and the
//! upstream realtime rate (24 kHz), with a 16 kHz midpoint used to compose
//! the 8 <-> 24 conversions.
//!
//! These are deliberately simple interpolation/averaging schemes, not a
//! general-purpose polyphase resampler: the ratios are fixed at compile time
//! (2x, 3x) and audio quality only has to clear "intelligible telephone
//! speech", not hi-fi.

/// Upsample 8 kHz samples to 16 kHz by linear interpolation: each input
/// sample is emitted followed by the midpoint to the next sample. The final
/// input sample has no successor, so its midpoint is a duplicate of itself.
pub fn upsample_8_to_16(samples: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for (i, &s) in samples.iter().enumerate() {
        out.push(s);
        let next = samples.get(i + 1).copied().unwrap_or(s);
        out.push(midpoint(s, next));
    }
    out
}

/// Downsample 16 kHz samples to 8 kHz by averaging consecutive pairs. A
/// trailing unpaired sample is passed through unchanged.
pub fn downsample_16_to_8(samples: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len().div_ceil(2));
    let mut chunks = samples.chunks_exact(2);
    for pair in &mut chunks {
        out.push(midpoint(pair[0], pair[1]));
    }
    if let [last] = chunks.remainder() {
        out.push(*last);
    }
    out
}

/// Downsample 24 kHz samples to 8 kHz by averaging non-overlapping blocks of
/// three. A trailing partial block is averaged over however many samples it
/// has.
pub fn downsample_24_to_8(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks(3)
        .map(|block| {
            let sum: i32 = block.iter().map(|&s| s as i32).sum();
            (sum / block.len() as i32) as i16
        })
        .collect()
}

/// Upsample 16 kHz samples to 24 kHz: each consecutive pair `(a, b)` becomes
/// `a, avg(a, b), b`, i.e. a 2:3 interpolation. A trailing unpaired sample is
/// emitted as-is.
pub fn upsample_16_to_24(samples: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len() * 3 / 2 + 1);
    let mut chunks = samples.chunks_exact(2);
    for pair in &mut chunks {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);
        out.push(midpoint(a, b));
        out.push(b);
    }
    if let [last] = chunks.remainder() {
        out.push(*last);
    }
    out
}

/// Upsample 8 kHz samples to 24 kHz, composed as 8 -> 16 -> 24 via
/// interpolation.
pub fn upsample_8_to_24(samples: &[i16]) -> Vec<i16> {
    upsample_16_to_24(&upsample_8_to_16(samples))
}

fn midpoint(a: i16, b: i16) -> i16 {
    (((a as i32) + (b as i32)) / 2) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsample_8_to_16_doubles_length_and_interleaves_midpoints() {
        let input = [0i16, 100, 200];
        let out = upsample_8_to_16(&input);
        assert_eq!(out.len(), 6);
        assert_eq!(out, vec![0, 50, 100, 150, 200, 200]);
    }

    #[test]
    fn downsample_16_to_8_averages_pairs() {
        let input = [0i16, 100, 200, 300];
        let out = downsample_16_to_8(&input);
        assert_eq!(out, vec![50, 250]);
    }

    #[test]
    fn downsample_16_to_8_passes_through_trailing_odd_sample() {
        let input = [0i16, 100, 77];
        let out = downsample_16_to_8(&input);
        assert_eq!(out, vec![50, 77]);
    }

    #[test]
    fn downsample_24_to_8_averages_blocks_of_three() {
        let input = [0i16, 90, 180, 300, 300, 300];
        let out = downsample_24_to_8(&input);
        assert_eq!(out, vec![90, 300]);
    }

    #[test]
    fn downsample_24_to_8_averages_trailing_partial_block() {
        let input = [0i16, 90, 180, 600];
        let out = downsample_24_to_8(&input);
        assert_eq!(out, vec![90, 600]);
    }

    #[test]
    fn upsample_16_to_24_triples_paired_length() {
        let input = [0i16, 300];
        let out = upsample_16_to_24(&input);
        assert_eq!(out, vec![0, 150, 300]);
    }

    #[test]
    fn composed_8_to_24_matches_manual_composition() {
        let input = [0i16, 800];
        let expected = upsample_16_to_24(&upsample_8_to_16(&input));
        assert_eq!(upsample_8_to_24(&input), expected);
    }

    #[test]
    fn resampling_round_trip_stays_within_one_lsb_for_a_ramp() {
        // a smooth ramp stands in for a low-frequency sinusoid: composing
        // upsample 8->24 then downsample 24->8 should reconstruct each
        // sample to within rounding error, not introduce a gross offset.
        let input: Vec<i16> = (0..50).map(|i| i * 100).collect();
        let up = upsample_8_to_24(&input);
        let down = downsample_24_to_8(&up);
        assert_eq!(down.len(), input.len());
        for (orig, back) in input.iter().zip(down.iter()) {
            assert!(
                (*orig as i32 - *back as i32).abs() <= 1,
                "orig={orig} back={back}"
            );
        }
    }

    #[test]
    fn empty_input_produces_empty_output() {
        assert!(upsample_8_to_16(&[]).is_empty());
        assert!(downsample_16_to_8(&[]).is_empty());
        assert!(downsample_24_to_8(&[]).is_empty());
        assert!(upsample_16_to_24(&[]).is_empty());
        assert!(upsample_8_to_24(&[]).is_empty());
    }
}
