//! A lightweight binaural panner: equal-power level differences, an
//! interaural delay and elevation-dependent filtering. No HRTF data set is
//! needed, which keeps rendering a pure function of its inputs.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

use crate::audio_buffer::AudioBuffer;
use crate::filter::Cascade;
use crate::geometry::Radian;

/// Speed of sound in air, m/s.
pub const SPEED_OF_SOUND: f64 = 343.0;

/// Elevations within this many radians of ear level are left unfiltered.
const ELEVATION_FILTER_THRESHOLD: Radian = 0.1;

/// Output peak after normalization is `1 / NORMALIZE_HEADROOM`.
const NORMALIZE_HEADROOM: f32 = 1.05;

/// Listener geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanConfig {
    /// Ear-to-ear distance, meters
    pub head_width: f64,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self { head_width: 0.18 }
    }
}

/// Equal-power `(left, right)` gains for a source at `azimuth` (positive
/// left).
pub fn pan_gains(azimuth: Radian) -> (f32, f32) {
    let pan = -azimuth.sin();
    let theta = (pan + 1.0) * FRAC_PI_4;
    (theta.cos() as f32, theta.sin() as f32)
}

/// Interaural time difference in seconds; positive means the sound reaches
/// the left ear first.
pub fn interaural_delay(azimuth: Radian, config: &PanConfig) -> f64 {
    config.head_width * azimuth.sin() / SPEED_OF_SOUND
}

/// Shapes the mono signal for elevation and returns it with the level factor
/// to apply.
fn elevation_cue(signal: &[f32], elevation: Radian, sample_rate: u32) -> (Vec<f32>, f32) {
    let fs = sample_rate as f64;
    let mut factor = elevation.cos();
    let shaped = if elevation > ELEVATION_FILTER_THRESHOLD {
        factor *= 1.0 + 0.2 * elevation.sin();
        Cascade::butter_highpass(2, 1500.0, fs).filtfilt(signal)
    } else if elevation < -ELEVATION_FILTER_THRESHOLD {
        factor *= 0.4 + 0.2 * elevation.abs().cos();
        let muffled = Cascade::butter_lowpass(4, 800.0, fs).filtfilt(signal);
        let rumble = Cascade::butter_bandpass(2, 100.0, 300.0, fs).filtfilt(&muffled);
        muffled
            .iter()
            .zip(&rumble)
            .map(|(m, r)| 0.6 * m + 0.4 * r)
            .collect()
    } else {
        signal.to_vec()
    };
    (shaped, factor as f32)
}

/// Delays `channel` by `delay` samples, keeping its length.
fn delay_channel(channel: &mut Vec<f32>, delay: usize) {
    let n = channel.len();
    let delay = delay.min(n);
    let mut delayed = vec![0.0; delay];
    delayed.extend_from_slice(&channel[..n - delay]);
    *channel = delayed;
}

/// Renders `signal` to stereo as if it came from `(azimuth, elevation)`.
///
/// The result is normalized so its peak is about 0.95, unless it is
/// effectively silent.
pub fn pan_stereo(
    signal: &[f32],
    azimuth: Radian,
    elevation: Radian,
    sample_rate: u32,
    config: &PanConfig,
) -> AudioBuffer {
    let (left_gain, right_gain) = pan_gains(azimuth);
    let (shaped, factor) = elevation_cue(signal, elevation, sample_rate);

    let mut left: Vec<f32> = shaped.iter().map(|s| s * left_gain * factor).collect();
    let mut right: Vec<f32> = shaped.iter().map(|s| s * right_gain * factor).collect();

    let itd = interaural_delay(azimuth, config);
    let delay = (itd.abs() * sample_rate as f64).round() as usize;
    if itd > 0.0 {
        delay_channel(&mut right, delay);
    } else if itd < 0.0 {
        delay_channel(&mut left, delay);
    }

    let mut stereo = AudioBuffer::from_channels(sample_rate, left, right);
    let peak = stereo.peak();
    if peak > 1e-6 {
        stereo.scale(1.0 / (peak * NORMALIZE_HEADROOM));
    }
    stereo
}
