// karaoke-core/src/lib.rs

//! The core logic for the karaoke performance engine.
//! This crate is responsible for microphone capture, pitch detection,
//! melody comparison, scoring, and playback-time bookkeeping. It is
//! completely headless and contains no UI code.

pub mod audio;
pub mod clock;
pub mod lyrics;
pub mod melody;
pub mod pitch;
pub mod render;
pub mod score;
pub mod session;
pub mod tuning;

/// Result of analyzing a single microphone frame.
// Clone is needed so a reading can be carried in `TickUpdate` snapshots.
#[derive(Debug, Clone)]
pub struct PitchReading {
    /// The detected fundamental frequency in Hz, if any.
    pub frequency: Option<f32>,
    /// MIDI note number of the detected frequency.
    pub midi: Option<i32>,
    /// Name of the nearest note (e.g. "A4").
    pub note_name: Option<String>,
}

impl PitchReading {
    /// Runs pitch detection and note mapping over one captured frame.
    pub fn from_frame(frame: &[f32], sample_rate: u32) -> Self {
        let frequency = pitch::detect_pitch(frame, sample_rate);
        let midi = frequency.map(tuning::frequency_to_midi);
        let note_name = midi.map(tuning::midi_to_note_name);
        Self {
            frequency,
            midi,
            note_name,
        }
    }

    /// A reading that carries no detected pitch.
    pub fn silent() -> Self {
        Self {
            frequency: None,
            midi: None,
            note_name: None,
        }
    }
}
