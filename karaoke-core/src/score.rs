//! # Scoring Module
//!
//! Folds per-detection pitch comparisons into a running performance score.
//! A sample is only ever recorded when both a detected pitch and an active
//! reference segment exist, so silence neither penalizes nor inflates the
//! average.

use crate::tuning;

/// Deviation at which a sample earns zero credit, in semitones.
pub const ZERO_CREDIT_SEMITONES: f32 = 0.5;

/// How one detected/reference pair is turned into a sample score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePolicy {
    /// Linear credit: 100 at perfect pitch, falling to 0 at half a semitone.
    #[default]
    Continuous,
    /// Legacy pass/fail at the half-semitone threshold, kept from an earlier
    /// build of the scoring screen. Remove once product sign-off confirms no
    /// song data still depends on it.
    HalfStepGate,
}

/// Running score state: `total / samples` is the displayed average.
#[derive(Debug, Default)]
pub struct ScoringAccumulator {
    total: f64,
    samples: u64,
    policy: ScorePolicy,
}

impl ScoringAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ScorePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Scores one detected pitch against the active reference frequency and
    /// folds it into the running state. Returns the sample score.
    pub fn record_sample(&mut self, detected: f32, reference: f32) -> f32 {
        let deviation = tuning::semitone_deviation(detected, reference).abs();
        let sample = match self.policy {
            ScorePolicy::Continuous => {
                (100.0 * (1.0 - deviation / ZERO_CREDIT_SEMITONES)).max(0.0)
            }
            ScorePolicy::HalfStepGate => {
                if deviation < ZERO_CREDIT_SEMITONES {
                    100.0
                } else {
                    0.0
                }
            }
        };
        self.total += f64::from(sample);
        self.samples += 1;
        sample
    }

    /// Running average, defined as 0 before the first sample.
    pub fn average(&self) -> f32 {
        if self.samples == 0 {
            0.0
        } else {
            (self.total / self.samples as f64) as f32
        }
    }

    /// Average rounded to the nearest integer for display.
    pub fn display_score(&self) -> u32 {
        self.average().round() as u32
    }

    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Full reset, used when a performance attempt starts over.
    pub fn reset(&mut self) {
        self.total = 0.0;
        self.samples = 0;
    }
}
