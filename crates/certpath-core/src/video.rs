//! Video-completion gate.
//!
//! Tracks simulated watch progress for one viewing. Progress is monotonic
//! while the gate lives, except for an explicit restart, and completion is
//! signalled exactly once.

use serde::Serialize;

/// Progress value at which a video counts as watched.
pub const COMPLETE: u8 = 100;

/// Snapshot of a gate after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoProgress {
    pub percent: u8,
    pub playing: bool,
    /// Set only on the tick that first reached 100.
    pub just_completed: bool,
}

/// Watch-progress gate for a single viewing.
#[derive(Debug, Clone, Default)]
pub struct VideoGate {
    percent: u8,
    playing: bool,
    signalled: bool,
}

impl VideoGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Completion has been signalled during this viewing.
    pub fn is_signalled(&self) -> bool {
        self.signalled
    }

    pub fn play(&mut self) {
        if self.percent < COMPLETE {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Advance by `delta` percent if playing. Returns the new progress.
    pub fn tick(&mut self, delta: u8) -> VideoProgress {
        let mut just_completed = false;
        if self.playing {
            self.percent = self.percent.saturating_add(delta).min(COMPLETE);
            if self.percent == COMPLETE {
                self.playing = false;
                if !self.signalled {
                    self.signalled = true;
                    just_completed = true;
                }
            }
        }
        VideoProgress {
            percent: self.percent,
            playing: self.playing,
            just_completed,
        }
    }

    /// Rewind to zero and stop. A completion already signalled stays signalled.
    pub fn restart(&mut self) {
        self.percent = 0;
        self.playing = false;
    }

    pub fn progress(&self) -> VideoProgress {
        VideoProgress {
            percent: self.percent,
            playing: self.playing,
            just_completed: false,
        }
    }
}
