//! Core configuration for noodle-animation-core.

use serde::{Deserialize, Serialize};

/// Configuration for unit conversion, obstacle handling and buffer sizing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Editor "animation mode". When off, configured entities stay disabled.
    pub animation_mode: bool,

    /// Scale from v3 noodle units to editor units (applied to v3 position keys).
    pub unit_scale: f32,

    /// Obstacle dimensions closer to zero than this are clamped to it.
    pub min_obstacle_size: f32,

    /// Depth offset subtracted from an obstacle's preloaded position.
    pub obstacle_depth_offset: f32,

    /// Initial capacity hint for per-tick event buffers.
    pub events_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            animation_mode: true,
            unit_scale: 1.667,
            min_obstacle_size: 0.06,
            obstacle_depth_offset: 0.4,
            events_capacity: 64,
        }
    }
}

impl Config {
    /// Clamp an obstacle dimension away from zero, preserving values outside the band.
    #[inline]
    pub fn clamp_obstacle_size(&self, a: f32) -> f32 {
        if -self.min_obstacle_size < a && a < self.min_obstacle_size {
            self.min_obstacle_size
        } else {
            a
        }
    }
}
