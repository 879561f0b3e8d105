//! # Pitch Detection Module
//!
//! This module implements the autocorrelation fundamental-frequency estimator
//! used for live vocal tracking. It favors robustness over precision: a singer
//! holding a note produces a strongly periodic signal, and the lag with the
//! highest self-similarity gives the period directly.
//!
//! ## Features
//! - RMS noise gate to suppress spurious detections in silence
//! - Leading/trailing trim so the correlation window hugs the actual signal
//! - Fixed lag search range covering human vocal fundamentals
//! - Works at any capture rate; the lag range is in samples

/// Minimum candidate period in samples. Together with [`MAX_LAG`] this bounds
/// the detectable band to `sample_rate / 1000 .. sample_rate / 50` Hz, which
/// covers vocal fundamentals at common capture rates.
pub const MIN_LAG: usize = 50;

/// Maximum candidate period in samples (exclusive).
pub const MAX_LAG: usize = 1000;

/// Frames with RMS energy below this are treated as silence.
const SILENCE_RMS_THRESHOLD: f32 = 0.01;

/// Samples with absolute value below this are trimmed from the frame edges.
const TRIM_THRESHOLD: f32 = 0.01;

/// Estimates the fundamental frequency of a single audio frame.
///
/// The algorithm:
/// 1. Gate on RMS energy; quiet frames are silence, not pitch.
/// 2. Trim near-zero samples from both ends of the frame.
/// 3. For every candidate lag, sum the unnormalized autocorrelation of the
///    trimmed buffer against itself shifted by that lag.
/// 4. The lag with the highest positive correlation is the period estimate.
///
/// This is O(lag_range * frame_len); at a 2048-sample frame it fits
/// comfortably inside one detection cycle.
///
/// # Arguments
/// * `signal` - One frame of mono samples in the range [-1, 1]
/// * `sample_rate` - Capture rate of the frame in Hz
///
/// # Returns
/// * `Some(frequency)` - Detected fundamental in Hz (always positive)
/// * `None` - Silence, or no lag produced a positive correlation
pub fn detect_pitch(signal: &[f32], sample_rate: u32) -> Option<f32> {
    if signal.is_empty() {
        return None;
    }

    let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt();
    if rms < SILENCE_RMS_THRESHOLD {
        return None;
    }

    // The RMS gate guarantees at least one sample above the trim threshold.
    let first = signal.iter().position(|s| s.abs() >= TRIM_THRESHOLD)?;
    let last = signal.iter().rposition(|s| s.abs() >= TRIM_THRESHOLD)?;
    let trimmed = &signal[first..=last];

    let mut best_lag = 0;
    let mut best_corr = 0.0f32;
    for lag in MIN_LAG..MAX_LAG {
        let mut corr = 0.0f32;
        for i in 0..trimmed.len().saturating_sub(lag) {
            corr += trimmed[i] * trimmed[i + lag];
        }
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 {
        return None;
    }
    Some(sample_rate as f32 / best_lag as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(frequency: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    #[test]
    fn silent_buffer_is_not_detected() {
        let frame = vec![0.0f32; 2048];
        assert_eq!(detect_pitch(&frame, 44_100), None);
    }

    #[test]
    fn quiet_signal_below_gate_is_not_detected() {
        let frame = sine(220.0, 44_100, 2048, 0.005);
        assert_eq!(detect_pitch(&frame, 44_100), None);
    }

    #[test]
    fn detects_sine_at_44100() {
        let frame = sine(220.0, 44_100, 2048, 0.5);
        let freq = detect_pitch(&frame, 44_100).expect("pitch");
        assert_relative_eq!(freq, 220.0, max_relative = 0.01);
    }

    #[test]
    fn detects_sine_at_48000() {
        let frame = sine(440.0, 48_000, 2048, 0.5);
        let freq = detect_pitch(&frame, 48_000).expect("pitch");
        assert_relative_eq!(freq, 440.0, max_relative = 0.01);
    }

    #[test]
    fn estimate_scales_with_sample_rate() {
        // The same buffer interpreted at twice the rate is an octave higher.
        let frame = sine(220.0, 44_100, 2048, 0.5);
        let low = detect_pitch(&frame, 44_100).expect("pitch");
        let high = detect_pitch(&frame, 88_200).expect("pitch");
        assert_relative_eq!(high, 2.0 * low, max_relative = 1e-6);
    }

    #[test]
    fn frame_shorter_than_min_lag_is_not_detected() {
        // Loud enough to pass the gate, but too short for any candidate lag.
        let frame = vec![0.5f32; 40];
        assert_eq!(detect_pitch(&frame, 44_100), None);
    }

    #[test]
    fn empty_frame_is_not_detected() {
        assert_eq!(detect_pitch(&[], 44_100), None);
    }
}
