//! # Lyric Timeline Module
//!
//! Ordered lyric lines with activation timestamps. The timeline itself is
//! immutable after load; the past/current/future classification is a pure
//! function of the current playback time, recomputed every tick.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

/// One lyric line and the playback time at which it becomes current.
#[derive(Debug, Clone, Deserialize)]
pub struct LyricLine {
    pub time: f32,
    pub text: String,
}

/// Top-level shape of a lyric file.
#[derive(Debug, Deserialize)]
struct LyricFile {
    lyrics: Vec<LyricLine>,
}

/// Display state of a lyric line at a given playback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Past,
    Current,
    Future,
}

/// The lyric timeline for one song.
#[derive(Debug, Default)]
pub struct LyricTimeline {
    lines: Vec<LyricLine>,
}

impl LyricTimeline {
    /// A timeline with no lines; classification is skipped entirely.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: Vec<LyricLine>) -> Self {
        Self { lines }
    }

    /// Parses a lyric timeline from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: LyricFile = serde_json::from_str(json)?;
        Ok(Self::from_lines(file.lyrics))
    }

    /// Loads a lyric file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Index of the current line: the one with the greatest activation time
    /// not after `time`. `None` when `time` precedes every activation.
    pub fn current_index(&self, time: f32) -> Option<usize> {
        self.lines.iter().rposition(|line| line.time <= time)
    }

    /// Classifies every line against `time`. At most one line is `Current`;
    /// lines before it are `Past`, lines after it `Future`.
    pub fn classify(&self, time: f32) -> Vec<LineState> {
        let current = self.current_index(time);
        self.lines
            .iter()
            .enumerate()
            .map(|(idx, _)| match current {
                Some(cur) if idx < cur => LineState::Past,
                Some(cur) if idx == cur => LineState::Current,
                _ => LineState::Future,
            })
            .collect()
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
