//! Loudness conversion for raw 16-bit PCM chunks.
//!
//! The mapping is a display scaling tuned by eye, not a calibrated level:
//! `rms(chunk)^0.8 / 4000 + 1`. The `+ 1` keeps silence at the unit radius
//! so the waveform never collapses onto the origin.

/// Power-law exponent applied to the RMS value.
pub const LOUDNESS_EXPONENT: f64 = 0.8;

/// Divisor bringing the compressed RMS into a radius-sized range.
pub const LOUDNESS_DIVISOR: f64 = 4000.0;

/// Baseline radius for a silent chunk.
pub const LOUDNESS_FLOOR: f64 = 1.0;

/// Root mean square of a chunk of signed 16-bit samples.
///
/// The result is truncated to an integer, matching the classic integer RMS
/// of 16-bit PCM. An empty chunk has an RMS of zero.
pub fn rms(chunk: &[i16]) -> u32 {
    if chunk.is_empty() {
        return 0;
    }

    let sum_of_squares: f64 = chunk.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_of_squares / chunk.len() as f64).sqrt() as u32
}

/// Converts one acquisition chunk into a loudness sample (always `>= 1.0`).
pub fn loudness(chunk: &[i16]) -> f64 {
    (rms(chunk) as f64).powf(LOUDNESS_EXPONENT) / LOUDNESS_DIVISOR + LOUDNESS_FLOOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_exactly_floor() {
        assert_eq!(loudness(&[0, 0, 0]), 1.0);
        assert_eq!(loudness(&[]), 1.0);
    }

    #[test]
    fn test_rms_truncates() {
        // sqrt((1 + 4 + 4) / 3) = sqrt(3) = 1.73..
        assert_eq!(rms(&[1, -2, 2]), 1);
        assert_eq!(rms(&[1000, -1000, 1000]), 1000);
    }

    #[test]
    fn test_rms_extremes_do_not_overflow() {
        assert_eq!(rms(&[i16::MIN, i16::MIN, i16::MIN]), 32768);
        assert_eq!(rms(&[i16::MAX; 3]), 32767);
    }

    #[test]
    fn test_loudness_never_below_floor() {
        let chunks: [[i16; 3]; 6] = [
            [0, 0, 0],
            [1, 0, -1],
            [100, -100, 50],
            [i16::MAX, i16::MIN, 0],
            [i16::MIN, i16::MIN, i16::MIN],
            [-7, 3, 12_000],
        ];
        for chunk in chunks {
            assert!(loudness(&chunk) >= 1.0, "chunk {chunk:?} fell below floor");
        }
    }

    #[test]
    fn test_loudness_matches_formula() {
        let expected = 1000f64.powf(0.8) / 4000.0 + 1.0;
        assert_eq!(loudness(&[1000, -1000, 1000]), expected);
    }

    #[test]
    fn test_loudness_is_monotonic_in_amplitude() {
        let quiet = loudness(&[500, -500, 500]);
        let loud = loudness(&[20_000, -20_000, 20_000]);
        assert!(loud > quiet);
        assert!(quiet > 1.0);
    }
}
