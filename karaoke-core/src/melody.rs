//! # Reference Melody Module
//!
//! The expected pitch contour of a song, as an ordered list of timed segments.
//! Segments are loaded once per song and queried every tick for the segment
//! active at the current playback time. A user-adjustable global offset shifts
//! the whole contour against the backing track without ever accumulating
//! drift, because every shift is recomputed from the bounds recorded at load.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

/// One segment record as stored in the melody file.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentRecord {
    pub start: f32,
    pub end: f32,
    pub freq: f32,
}

/// Top-level shape of a melody file.
#[derive(Debug, Deserialize)]
struct MelodyFile {
    segments: Vec<SegmentRecord>,
}

/// A melody segment with its load-time bounds kept immutable so the global
/// offset can be reapplied at any time.
#[derive(Debug, Clone)]
pub struct Segment {
    start: f32,
    end: f32,
    freq: f32,
    original_start: f32,
    original_end: f32,
}

impl Segment {
    /// Current start time in seconds, offset applied.
    pub fn start(&self) -> f32 {
        self.start
    }

    /// Current end time in seconds, offset applied.
    pub fn end(&self) -> f32 {
        self.end
    }

    /// Reference frequency of this segment in Hz.
    pub fn frequency(&self) -> f32 {
        self.freq
    }
}

/// The reference melody for one song.
#[derive(Debug, Default)]
pub struct ReferenceMelody {
    segments: Vec<Segment>,
    offset: f32,
}

impl ReferenceMelody {
    /// A melody with no segments. Scoring against it never records a sample.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a melody from raw records, preserving load order.
    ///
    /// Records with `start > end` are malformed and dropped with a warning;
    /// gaps and overlaps between segments are left as-is (gaps are silence,
    /// overlaps resolve to the first match in load order).
    pub fn from_records(records: Vec<SegmentRecord>) -> Self {
        let mut segments = Vec::with_capacity(records.len());
        let mut dropped = 0usize;
        for record in records {
            if record.start > record.end {
                dropped += 1;
                continue;
            }
            segments.push(Segment {
                start: record.start,
                end: record.end,
                freq: record.freq,
                original_start: record.start,
                original_end: record.end,
            });
        }
        if dropped > 0 {
            log::warn!("dropped {} melody segments with start > end", dropped);
        }
        Self {
            segments,
            offset: 0.0,
        }
    }

    /// Parses a melody from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: MelodyFile = serde_json::from_str(json)?;
        Ok(Self::from_records(file.segments))
    }

    /// Loads a melody file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Returns the segment active at `time`, or `None` during a gap.
    ///
    /// If overlapping segments both cover `time`, the first one in load order
    /// wins. Source data is expected to be non-overlapping; the tie-break is
    /// documented behavior, not a correction.
    pub fn active_segment_at(&self, time: f32) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| s.start <= time && time <= s.end)
    }

    /// Shifts every segment by `delta` seconds relative to its load-time
    /// bounds. Repeated calls with the same delta are idempotent, and a delta
    /// of zero restores the original bounds exactly.
    pub fn set_offset(&mut self, delta: f32) {
        for segment in &mut self.segments {
            segment.start = segment.original_start + delta;
            segment.end = segment.original_end + delta;
        }
        self.offset = delta;
    }

    /// The currently applied global offset in seconds.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// End time of the final segment, used as the track-duration fallback
    /// while transport metadata is still unknown.
    pub fn last_end(&self) -> Option<f32> {
        self.segments.last().map(|s| s.end)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(start: f32, end: f32, freq: f32) -> SegmentRecord {
        SegmentRecord { start, end, freq }
    }

    #[test]
    fn parses_melody_json() {
        let melody = ReferenceMelody::from_json_str(
            r#"{"segments": [{"start": 0.0, "end": 2.5, "freq": 220.0},
                             {"start": 3.0, "end": 5.0, "freq": 246.9}]}"#,
        )
        .expect("parse");
        assert_eq!(melody.len(), 2);
        assert_relative_eq!(melody.last_end().unwrap(), 5.0);
    }

    #[test]
    fn finds_active_segment_and_gaps() {
        let melody =
            ReferenceMelody::from_records(vec![record(0.0, 2.0, 220.0), record(3.0, 5.0, 330.0)]);
        assert_relative_eq!(melody.active_segment_at(1.0).unwrap().frequency(), 220.0);
        // Boundaries are inclusive on both ends.
        assert!(melody.active_segment_at(2.0).is_some());
        assert!(melody.active_segment_at(3.0).is_some());
        // The gap between segments is silence.
        assert!(melody.active_segment_at(2.5).is_none());
        assert!(melody.active_segment_at(-1.0).is_none());
        assert!(melody.active_segment_at(6.0).is_none());
    }

    #[test]
    fn overlap_resolves_to_first_in_load_order() {
        let melody =
            ReferenceMelody::from_records(vec![record(0.0, 4.0, 220.0), record(2.0, 6.0, 330.0)]);
        assert_relative_eq!(melody.active_segment_at(3.0).unwrap().frequency(), 220.0);
    }

    #[test]
    fn offset_is_idempotent_and_reversible() {
        let mut melody = ReferenceMelody::from_records(vec![record(1.0, 2.0, 220.0)]);
        melody.set_offset(0.5);
        assert_relative_eq!(melody.segments()[0].start(), 1.5);
        assert_relative_eq!(melody.segments()[0].end(), 2.5);

        // Applying the same offset again must not drift.
        melody.set_offset(0.5);
        assert_relative_eq!(melody.segments()[0].start(), 1.5);
        assert_relative_eq!(melody.segments()[0].end(), 2.5);

        // Offset zero restores the load-time bounds exactly.
        melody.set_offset(0.0);
        assert_eq!(melody.segments()[0].start(), 1.0);
        assert_eq!(melody.segments()[0].end(), 2.0);
    }

    #[test]
    fn malformed_segments_are_dropped() {
        let melody =
            ReferenceMelody::from_records(vec![record(5.0, 1.0, 220.0), record(0.0, 2.0, 330.0)]);
        assert_eq!(melody.len(), 1);
        assert_relative_eq!(melody.active_segment_at(1.0).unwrap().frequency(), 330.0);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ReferenceMelody::from_json_str("not json").is_err());
    }

    #[test]
    fn empty_melody_has_no_duration_fallback() {
        let melody = ReferenceMelody::empty();
        assert!(melody.is_empty());
        assert!(melody.last_end().is_none());
        assert!(melody.active_segment_at(0.0).is_none());
    }
}
