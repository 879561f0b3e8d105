//! # Performance Session Module
//!
//! One performance attempt, as an explicit engine instance: the playback
//! clock, the reference melody and lyric timeline, the running score, the
//! append-only pitch trace, and the microphone capture worker all live here
//! and are torn down together. Nothing in the engine is global.
//!
//! ## Architecture
//! - **Session thread**: owns all engine state and is driven by `tick`
//! - **Detection worker**: dedicated thread for capture and pitch analysis
//! - **Communication**: crossbeam channels for frames, readings, shutdown
//!
//! Detection results cross from the worker to the session over a channel and
//! are consumed on the next tick, so scoring, melody offset changes, and the
//! pitch history are only ever touched from the session thread. No locking.

use std::thread::{self, JoinHandle};

use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};

use crate::PitchReading;
use crate::audio;
use crate::clock::{PlaybackClock, PlaybackState};
use crate::lyrics::LyricTimeline;
use crate::melody::ReferenceMelody;
use crate::score::ScoringAccumulator;

/// One detected pitch stamped with the playback time it was heard at.
/// Collected for the rendering trace only; scoring happens as samples arrive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserPitchSample {
    pub time: f32,
    pub frequency: f32,
}

/// Snapshot returned by [`PerformanceSession::tick`], everything a frontend
/// needs to refresh its display.
#[derive(Debug, Clone)]
pub struct TickUpdate {
    /// Accepted playback position after seek rejection.
    pub position: f32,
    pub state: PlaybackState,
    /// Latest detection result consumed this tick, if any arrived.
    pub reading: Option<PitchReading>,
    /// Score of the last sample recorded this tick.
    pub sample_score: Option<f32>,
    pub average_score: f32,
    /// Index of the current lyric line.
    pub current_line: Option<usize>,
    /// True exactly once, on the tick that ends the performance. The
    /// receiving collaborator decides what to show next.
    pub finished: bool,
}

/// Handle to the detection worker thread.
///
/// The worker owns the cpal stream for its whole lifetime and loops over
/// incoming frames until the shutdown channel fires or every sender is gone.
/// Dropping the handle cancels the worker and joins it, so no detection
/// cycle can fire after release.
#[derive(Debug)]
struct DetectionWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    fn spawn(reading_tx: Sender<PitchReading>) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let thread_handle = thread::spawn(move || {
            let (frame_tx, frame_rx) = crossbeam_channel::unbounded::<Vec<f32>>();

            let (stream, sample_rate) = match audio::start_capture(frame_tx) {
                Ok(pair) => pair,
                Err(err) => {
                    // Not fatal to playback: the pitch and score surfaces
                    // simply stay in their no-signal state.
                    log::warn!("microphone unavailable, pitch tracking disabled: {:#}", err);
                    return;
                }
            };

            loop {
                crossbeam_channel::select! {
                    recv(frame_rx) -> msg => match msg {
                        Ok(frame) => {
                            let reading = PitchReading::from_frame(&frame, sample_rate);
                            if reading_tx.send(reading).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    },
                    recv(shutdown_rx) -> _ => break,
                }
            }

            if let Err(err) = stream.pause() {
                log::warn!("error stopping capture stream: {}", err);
            }
            drop(stream);
            log::debug!("detection worker stopped");
        });

        Self {
            shutdown_tx,
            thread_handle: Some(thread_handle),
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// A single performance attempt against one song.
#[derive(Debug)]
pub struct PerformanceSession {
    clock: PlaybackClock,
    melody: ReferenceMelody,
    lyrics: LyricTimeline,
    score: ScoringAccumulator,
    history: Vec<UserPitchSample>,
    worker: Option<DetectionWorker>,
    reading_tx: Sender<PitchReading>,
    reading_rx: Receiver<PitchReading>,
}

impl PerformanceSession {
    /// Builds a session for one song. When the transport's duration is not
    /// yet known, the end of the reference melody stands in for it.
    pub fn new(
        melody: ReferenceMelody,
        lyrics: LyricTimeline,
        transport_duration: Option<f32>,
    ) -> Self {
        let duration = transport_duration.or_else(|| melody.last_end());
        let (reading_tx, reading_rx) = crossbeam_channel::unbounded();
        Self {
            clock: PlaybackClock::new(duration),
            melody,
            lyrics,
            score: ScoringAccumulator::new(),
            history: Vec::new(),
            worker: None,
            reading_tx,
            reading_rx,
        }
    }

    /// Starts or resumes playback.
    pub fn play(&mut self) {
        self.clock.play();
    }

    /// Pauses playback and releases the microphone.
    pub fn pause(&mut self) {
        self.clock.pause();
        self.release_capture();
    }

    /// Acquires the microphone and starts the detection worker. Idempotent;
    /// capture failure is reported by the worker and leaves the session in
    /// its no-signal state.
    pub fn start_capture(&mut self) {
        if self.worker.is_none() {
            self.worker = Some(DetectionWorker::spawn(self.reading_tx.clone()));
            log::info!("detection worker started");
        }
    }

    pub fn capture_active(&self) -> bool {
        self.worker.is_some()
    }

    /// One engine step: feeds the transport's position report through the
    /// no-seek check, consumes pending detection results, and classifies the
    /// lyric timeline at the accepted time.
    ///
    /// When the accepted position differs from `reported_position`, the
    /// caller must write the accepted value back to the transport.
    pub fn tick(&mut self, reported_position: f32) -> TickUpdate {
        let was_ended = self.clock.state() == PlaybackState::Ended;
        let position = self.clock.observe(reported_position);

        let mut latest = None;
        let mut sample_score = None;
        while let Ok(reading) = self.reading_rx.try_recv() {
            if let Some(sample) = self.ingest_reading(&reading) {
                sample_score = Some(sample);
            }
            latest = Some(reading);
        }

        let finished = !was_ended && self.clock.state() == PlaybackState::Ended;
        if finished {
            self.release_capture();
            log::info!(
                "performance complete, final score {}",
                self.score.display_score()
            );
        }

        TickUpdate {
            position,
            state: self.clock.state(),
            reading: latest,
            sample_score,
            average_score: self.score.average(),
            current_line: self.lyrics.current_index(position),
            finished,
        }
    }

    /// Consumes one detection result at the current playback position:
    /// appends it to the pitch trace and, when a reference segment is active,
    /// scores it. Returns the sample score if one was recorded.
    ///
    /// `tick` drains the worker channel through this; a frontend or test can
    /// also call it directly with simulated detection.
    pub fn ingest_reading(&mut self, reading: &PitchReading) -> Option<f32> {
        let frequency = reading.frequency?;
        let time = self.clock.position();
        self.history.push(UserPitchSample { time, frequency });
        let segment = self.melody.active_segment_at(time)?;
        Some(self.score.record_sample(frequency, segment.frequency()))
    }

    /// Transport end signal: the track finished on its own.
    pub fn end(&mut self) {
        self.clock.end();
        self.release_capture();
    }

    /// Starts the attempt over: score and pitch trace cleared, clock back to
    /// `Stopped`, microphone released. The melody offset is preserved.
    pub fn reset(&mut self) {
        self.release_capture();
        self.clock.reset();
        self.score.reset();
        self.history.clear();
    }

    /// Applies a user-controlled global delay to the reference melody.
    pub fn set_melody_offset(&mut self, delta: f32) {
        self.melody.set_offset(delta);
    }

    /// Installs the track duration once transport metadata arrives.
    pub fn set_duration(&mut self, duration: f32) {
        self.clock.set_duration(duration);
    }

    pub fn melody(&self) -> &ReferenceMelody {
        &self.melody
    }

    pub fn lyrics(&self) -> &LyricTimeline {
        &self.lyrics
    }

    pub fn score(&self) -> &ScoringAccumulator {
        &self.score
    }

    /// The append-only pitch trace for rendering.
    pub fn history(&self) -> &[UserPitchSample] {
        &self.history
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn position(&self) -> f32 {
        self.clock.position()
    }

    pub fn duration(&self) -> Option<f32> {
        self.clock.duration()
    }

    /// Stops the detection worker and discards readings still in flight, so
    /// nothing can score after release. Safe to call on every exit path.
    fn release_capture(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker); // cancels and joins the worker thread
            while self.reading_rx.try_recv().is_ok() {}
            log::info!("microphone released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melody::SegmentRecord;
    use approx::assert_relative_eq;

    fn one_segment_melody(start: f32, end: f32, freq: f32) -> ReferenceMelody {
        ReferenceMelody::from_records(vec![SegmentRecord { start, end, freq }])
    }

    fn detected(frequency: f32) -> PitchReading {
        PitchReading {
            frequency: Some(frequency),
            midi: None,
            note_name: None,
        }
    }

    #[test]
    fn perfect_reading_scores_one_hundred() {
        let mut session = PerformanceSession::new(
            one_segment_melody(0.0, 30.0, 220.0),
            LyricTimeline::empty(),
            None,
        );
        session.play();
        session.tick(1.0);
        let sample = session.ingest_reading(&detected(220.0));
        assert_relative_eq!(sample.unwrap(), 100.0, epsilon = 1e-3);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn reading_outside_any_segment_is_traced_but_not_scored() {
        let mut session = PerformanceSession::new(
            one_segment_melody(10.0, 20.0, 220.0),
            LyricTimeline::empty(),
            Some(30.0),
        );
        session.play();
        session.tick(1.0);
        assert_eq!(session.ingest_reading(&detected(220.0)), None);
        assert_eq!(session.score().sample_count(), 0);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn silent_reading_is_ignored_entirely() {
        let mut session = PerformanceSession::new(
            one_segment_melody(0.0, 30.0, 220.0),
            LyricTimeline::empty(),
            None,
        );
        session.play();
        session.tick(1.0);
        assert_eq!(session.ingest_reading(&PitchReading::silent()), None);
        assert!(session.history().is_empty());
        assert_eq!(session.score().sample_count(), 0);
    }

    #[test]
    fn melody_offset_moves_the_scoring_window() {
        let mut session = PerformanceSession::new(
            one_segment_melody(10.0, 20.0, 220.0),
            LyricTimeline::empty(),
            Some(60.0),
        );
        session.set_melody_offset(5.0);
        session.play();
        // Walk forward in sub-second steps so every report is accepted.
        let mut t = 0.0;
        while t <= 12.0 {
            session.tick(t);
            t += 0.5;
        }
        // 12s is inside the original window but before the shifted one.
        assert_eq!(session.position(), 12.0);
        assert_eq!(session.ingest_reading(&detected(220.0)), None);
        while t <= 16.0 {
            session.tick(t);
            t += 0.5;
        }
        assert_eq!(session.position(), 16.0);
        assert!(session.ingest_reading(&detected(220.0)).is_some());
    }

    #[test]
    fn reset_clears_score_and_trace_but_keeps_offset() {
        let mut session = PerformanceSession::new(
            one_segment_melody(0.0, 30.0, 220.0),
            LyricTimeline::empty(),
            None,
        );
        session.set_melody_offset(0.25);
        session.play();
        session.tick(1.0);
        session.ingest_reading(&detected(220.0));
        session.reset();
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert_eq!(session.position(), 0.0);
        assert_eq!(session.score().sample_count(), 0);
        assert!(session.history().is_empty());
        assert_relative_eq!(session.melody().offset(), 0.25);
    }

    #[test]
    fn tick_reports_current_lyric_line() {
        let lyrics = LyricTimeline::from_json_str(
            r#"{"lyrics": [{"time": 0.0, "text": "a"}, {"time": 2.0, "text": "b"}]}"#,
        )
        .unwrap();
        let mut session =
            PerformanceSession::new(one_segment_melody(0.0, 10.0, 220.0), lyrics, None);
        session.play();
        assert_eq!(session.tick(0.5).current_line, Some(0));
        assert_eq!(session.tick(1.0).current_line, Some(0));
        assert_eq!(session.tick(1.9).current_line, Some(0));
        assert_eq!(session.tick(2.1).current_line, Some(1));
    }

    #[test]
    fn finished_fires_once_and_releases_capture() {
        let mut session = PerformanceSession::new(
            one_segment_melody(0.0, 2.0, 220.0),
            LyricTimeline::empty(),
            Some(2.0),
        );
        session.play();
        let mut fired = 0;
        let mut t = 0.0;
        while t <= 2.5 {
            let update = session.tick(t);
            if update.finished {
                fired += 1;
            }
            t += 0.25;
        }
        assert_eq!(fired, 1);
        assert_eq!(session.state(), PlaybackState::Ended);
        assert!(!session.capture_active());
    }

    #[test]
    fn pause_is_idempotent_without_capture() {
        let mut session = PerformanceSession::new(
            ReferenceMelody::empty(),
            LyricTimeline::empty(),
            Some(10.0),
        );
        session.play();
        session.pause();
        session.pause();
        assert_eq!(session.state(), PlaybackState::Paused);
        assert!(!session.capture_active());
    }
}
