//! Distance to perceptual parameters: closer obstacles pulse faster, sound
//! higher and play louder.

use serde::{Deserialize, Serialize};

/// The distances over which cues change. Anything nearer or further is
/// clamped to the ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRange {
    /// Closest distance that still changes the cue, meters
    pub min: f64,
    /// Furthest distance that still changes the cue, meters
    pub max: f64,
}

impl Default for DistanceRange {
    fn default() -> Self {
        Self { min: 0.3, max: 4.0 }
    }
}

impl DistanceRange {
    /// Clamps `r` into the range. An inverted range pins everything to `max`.
    pub fn clamp(&self, r: f64) -> f64 {
        r.max(self.min).min(self.max)
    }

    /// Whether both ends are finite, non-negative and in order.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && 0.0 <= self.min && self.min <= self.max
    }

    /// Linear interpolation from `near` at `min` to `far` at `max`.
    fn interp(&self, r: f64, near: f32, far: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return near;
        }
        let t = ((self.clamp(r) - self.min) / span) as f32;
        near + (far - near) * t
    }
}

/// What a single obstacle sounds like before sector timbre is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioParams {
    /// Tremolo rate, Hz
    pub tremolo_rate: f32,
    /// Tone fundamental, Hz
    pub frequency: f32,
    /// Linear gain
    pub gain: f32,
}

/// [`distance_to_params`] over an explicit range.
pub fn distance_to_params_in(r: f64, range: &DistanceRange) -> AudioParams {
    AudioParams {
        tremolo_rate: range.interp(r, 2.0, 0.5),
        frequency: range.interp(r, 800.0, 300.0),
        gain: range.interp(r, 0.9, 0.4),
    }
}

/// Maps a distance in meters to [`AudioParams`] over the default
/// 0.3 to 4.0 m range.
pub fn distance_to_params(r: f64) -> AudioParams {
    distance_to_params_in(r, &DistanceRange::default())
}
