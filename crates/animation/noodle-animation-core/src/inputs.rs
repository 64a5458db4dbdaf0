//! Input contracts for the core engine.
//!
//! The playback clock is owned by the host; each tick it passes a
//! [`ClockSample`] into `Engine::update`. Beat to song-time conversion across
//! tempo changes is delegated to a [`BeatTimeMap`].

use serde::{Deserialize, Serialize};

/// Playback clock state for one tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClockSample {
    /// Map beat time (drives track events).
    pub beat_time: f32,
    /// Song-BPM time (drives entity windows and path animations).
    pub song_time: f32,
    #[serde(default)]
    pub is_playing: bool,
}

impl ClockSample {
    /// A sample where beat time and song time coincide (no tempo changes).
    pub fn at(time: f32) -> Self {
        Self {
            beat_time: time,
            song_time: time,
            is_playing: true,
        }
    }

    pub fn paused(mut self) -> Self {
        self.is_playing = false;
        self
    }
}

/// Converts a map beat into song-BPM time.
pub trait BeatTimeMap {
    fn beat_to_song_time(&self, beat: f32) -> f32;
}

/// Maps without tempo changes.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityBeatMap;

impl BeatTimeMap for IdentityBeatMap {
    #[inline]
    fn beat_to_song_time(&self, beat: f32) -> f32 {
        beat
    }
}
