//! # Playback Clock Module
//!
//! The single source of playback time for the engine. The clock is a small
//! state machine fed by position reports from the host transport; every other
//! component is a pure function of the accepted time. Melody alignment and
//! scoring assume continuous real-time progression, so the clock rejects any
//! position report that could only come from a user-initiated seek.

/// Largest forward step accepted between two position reports, in seconds.
/// Host media clocks report a few times per second; anything larger is
/// treated as a seek attempt.
pub const MAX_TICK_ADVANCE: f32 = 1.0;

/// Playback lifecycle. `Ended` is terminal for a performance attempt; only
/// `reset` leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
    Ended,
}

/// Monotonic playback clock with seek rejection.
#[derive(Debug)]
pub struct PlaybackClock {
    state: PlaybackState,
    position: f32,
    duration: Option<f32>,
}

impl PlaybackClock {
    /// Creates a stopped clock at position zero. The duration may be unknown
    /// until transport metadata arrives.
    pub fn new(duration: Option<f32>) -> Self {
        Self {
            state: PlaybackState::Stopped,
            position: 0.0,
            duration,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// The last accepted playback position in seconds.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn duration(&self) -> Option<f32> {
        self.duration
    }

    /// Installs the track duration once transport metadata is available.
    pub fn set_duration(&mut self, duration: f32) {
        self.duration = Some(duration);
    }

    /// `start` event: begins or resumes playback. Ignored once ended.
    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Stopped | PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
            }
            PlaybackState::Playing | PlaybackState::Ended => {}
        }
    }

    /// `pause` event.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// `tick` / `seek-attempt` event: feeds one transport position report
    /// through the no-seek check and returns the accepted position.
    ///
    /// A report is accepted only if it moves forward from the last accepted
    /// position by at most [`MAX_TICK_ADVANCE`]. Backward motion or a larger
    /// jump is rejected and the last good position is returned, for the
    /// caller to write back to the transport. Reaching the track duration
    /// transitions the clock to `Ended`.
    pub fn observe(&mut self, reported: f32) -> f32 {
        if self.state != PlaybackState::Playing {
            return self.position;
        }

        let step = reported - self.position;
        if step < 0.0 || step > MAX_TICK_ADVANCE {
            log::debug!(
                "rejected position report {:.3}s (last good {:.3}s)",
                reported,
                self.position
            );
            return self.position;
        }

        self.position = reported;
        if let Some(duration) = self.duration {
            if self.position >= duration {
                self.state = PlaybackState::Ended;
            }
        }
        self.position
    }

    /// `end` event from the transport.
    pub fn end(&mut self) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.state = PlaybackState::Ended;
            }
            PlaybackState::Stopped | PlaybackState::Ended => {}
        }
    }

    /// `reset` event: back to the initial state for a fresh attempt.
    pub fn reset(&mut self) {
        self.state = PlaybackState::Stopped;
        self.position = 0.0;
    }
}
