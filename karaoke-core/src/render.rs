//! # Render Mapping Module
//!
//! Pure time/frequency to pixel mappings consumed by whatever surface draws
//! the melody band, the live pitch trace, and the time marker. The engine
//! never draws; it only answers "where".
//!
//! Frequency uses a log2 scale: pitch perception and the semitone deviation
//! the scoring uses are both logarithmic in frequency, and a linear axis
//! would crush the range where vocals actually live.

use crate::melody::ReferenceMelody;

/// Bottom of the displayed frequency range in Hz.
pub const FREQ_FLOOR_HZ: f32 = 65.0;

/// Top of the displayed frequency range in Hz.
pub const FREQ_CEIL_HZ: f32 = 1500.0;

/// Maps a playback time to a horizontal pixel position.
pub fn time_to_x(time: f32, total_duration: f32, width: f32) -> f32 {
    if total_duration <= 0.0 {
        return 0.0;
    }
    (time / total_duration) * width
}

/// Maps a frequency to a vertical pixel position on the log2 scale.
/// Non-positive frequencies (silence) land at the floor of the canvas.
pub fn frequency_to_y(frequency: f32, height: f32) -> f32 {
    if frequency <= 0.0 {
        return height;
    }
    let log_min = FREQ_FLOOR_HZ.log2();
    let log_max = FREQ_CEIL_HZ.log2();
    let normalized = (frequency.log2() - log_min) / (log_max - log_min);
    height - normalized * height
}

/// Resolves the total duration used for horizontal mapping: the transport's
/// duration when metadata has loaded, else the end of the reference melody,
/// else 1 second so mapping stays finite.
pub fn resolve_duration(transport_duration: Option<f32>, melody: &ReferenceMelody) -> f32 {
    transport_duration
        .filter(|d| *d > 0.0)
        .or_else(|| melody.last_end())
        .unwrap_or(1.0)
}

/// Horizontal scroll offset for a canvas wider than the visible viewport:
/// the window advances proportionally to playback time, clamped so it never
/// scrolls past either edge of the canvas.
pub fn scroll_offset(time: f32, total_duration: f32, canvas_width: f32, view_width: f32) -> f32 {
    let overflow = (canvas_width - view_width).max(0.0);
    if total_duration <= 0.0 || overflow == 0.0 {
        return 0.0;
    }
    ((time / total_duration) * overflow).clamp(0.0, overflow)
}
