//! # Note Mapping Module
//!
//! Pure conversions between frequency, MIDI note number, and note name, based
//! on equal temperament with A4 = 440 Hz. Also provides the logarithmic
//! pitch-distance measure the scoring layer is built on.

/// Chromatic note names within one octave, starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts a frequency in Hz to the nearest MIDI note number.
///
/// Any finite positive frequency is accepted; values far outside the musical
/// range simply map to extreme note numbers.
pub fn frequency_to_midi(frequency: f32) -> i32 {
    (12.0 * (frequency / 440.0).log2() + 69.0).round() as i32
}

/// Converts a MIDI note number to a note name such as "A4" or "C#3".
///
/// Euclidean division keeps the name table lookup well-defined even for the
/// negative note numbers produced by absurdly low frequencies.
pub fn midi_to_note_name(midi: i32) -> String {
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", name, octave)
}

/// Convenience wrapper: note name for a raw frequency.
pub fn note_name_for(frequency: f32) -> String {
    midi_to_note_name(frequency_to_midi(frequency))
}

/// Signed distance between two frequencies in semitones.
///
/// Positive means `frequency` is sharp of `reference`, negative flat.
/// 100 cents = 1 semitone, 12 semitones = 1 octave.
pub fn semitone_deviation(frequency: f32, reference: f32) -> f32 {
    12.0 * (frequency / reference).log2()
}
