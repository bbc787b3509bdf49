//! Effects applied to mono cues. Every effect is a per-sample multiply or a
//! delayed add; none of them resample.

use std::f64::consts::PI;

use crate::filter::Cascade;

/// Seconds elapsed at sample `i`.
fn time(i: usize, sample_rate: u32) -> f64 {
    i as f64 / sample_rate as f64
}

/// Multiplies each sample by `envelope(t)`.
fn modulate(mut sig: Vec<f32>, sample_rate: u32, envelope: impl Fn(f64) -> f64) -> Vec<f32> {
    for (i, s) in sig.iter_mut().enumerate() {
        *s *= envelope(time(i, sample_rate)) as f32;
    }
    sig
}

/// Adds `sig` delayed by `delay` samples and scaled by `level` back into
/// itself.
fn add_delayed(mut sig: Vec<f32>, delay: usize, level: f32) -> Vec<f32> {
    if delay == 0 || delay >= sig.len() {
        return sig;
    }
    // walk backwards so each tap reads the dry sample
    for i in (delay..sig.len()).rev() {
        sig[i] += sig[i - delay] * level;
    }
    sig
}

/// Full-depth amplitude modulation at `rate` Hz: `0.5 + 0.5 sin(2 pi rate t)`.
pub fn tremolo(sig: Vec<f32>, sample_rate: u32, rate: f32) -> Vec<f32> {
    let rate = rate as f64;
    modulate(sig, sample_rate, |t| 0.5 + 0.5 * (2.0 * PI * rate * t).sin())
}

/// The "behind you" treatment: a zero-phase 2nd-order low-pass at `cutoff`,
/// an 80 ms echo at 30% and an overall 0.8 trim.
pub fn darken(sig: Vec<f32>, sample_rate: u32, cutoff: f32) -> Vec<f32> {
    const ECHO_SECS: f64 = 0.08;
    const ECHO_LEVEL: f32 = 0.3;

    let filtered = Cascade::butter_lowpass(2, cutoff as f64, sample_rate as f64).filtfilt(&sig);
    let delay = (ECHO_SECS * sample_rate as f64) as usize;
    let mut out = add_delayed(filtered, delay, ECHO_LEVEL);
    for s in out.iter_mut() {
        *s *= 0.8;
    }
    out
}

/// Shallow amplitude wobble: `1 + depth sin(2 pi rate t)`.
pub fn vibrato(sig: Vec<f32>, sample_rate: u32, rate: f32, depth: f32) -> Vec<f32> {
    let (rate, depth) = (rate as f64, depth as f64);
    modulate(sig, sample_rate, |t| 1.0 + depth * (2.0 * PI * rate * t).sin())
}

/// Adds one copy delayed by `delay_ms` at `depth` amplitude.
pub fn chorus(sig: Vec<f32>, sample_rate: u32, delay_ms: f32, depth: f32) -> Vec<f32> {
    let delay = (delay_ms as f64 * sample_rate as f64 / 1000.0) as usize;
    add_delayed(sig, delay, depth)
}

/// Linear fade in and out over `fade_secs`, never longer than half the
/// signal so short segments still start and end at zero.
pub fn apply_fade(mut sig: Vec<f32>, sample_rate: u32, fade_secs: f64) -> Vec<f32> {
    let n = sig.len();
    let fade = ((fade_secs * sample_rate as f64) as usize).min(n / 2);
    if fade == 0 {
        return sig;
    }
    let step = |i: usize| {
        if fade == 1 {
            0.0
        } else {
            i as f32 / (fade - 1) as f32
        }
    };
    for i in 0..fade {
        sig[i] *= step(i);
        sig[n - 1 - i] *= step(i);
    }
    sig
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: u32 = 8000;

    fn ones(n: usize) -> Vec<f32> {
        vec![1.0; n]
    }

    #[test]
    fn tremolo_stays_in_unit_range() {
        let out = tremolo(ones(8000), FS, 2.0);
        assert!(out.iter().all(|&s| (0.0..=1.0).contains(&s)));
        assert!((out[0] - 0.5).abs() < 1e-6);
        // quarter period of 2 Hz is 1000 samples
        assert!((out[1000] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn vibrato_depth_bounds() {
        let out = vibrato(ones(8000), FS, 4.5, 0.15);
        let max = out.iter().cloned().fold(f32::MIN, f32::max);
        let min = out.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max <= 1.15 + 1e-5 && max > 1.14);
        assert!(min >= 0.85 - 1e-5 && min < 0.86);
    }

    #[test]
    fn chorus_adds_delayed_copy() {
        let mut sig = vec![0.0; 400];
        sig[0] = 1.0;
        let out = chorus(sig, FS, 15.0, 0.3);
        // 15 ms at 8 kHz
        assert_eq!(out[0], 1.0);
        assert!((out[120] - 0.3).abs() < 1e-7);
        assert_eq!(out.iter().filter(|&&s| s != 0.0).count(), 2);
    }

    #[test]
    fn chorus_longer_than_signal_is_a_no_op() {
        let out = chorus(vec![0.5; 10], FS, 15.0, 0.3);
        assert_eq!(out, vec![0.5; 10]);
    }

    #[test]
    fn darken_echoes_after_80ms() {
        let mut sig = vec![0.0; 2000];
        sig[100] = 1.0;
        let out = darken(sig, FS, 1200.0);
        // 80 ms at 8 kHz is 640 samples
        let around = |c: usize| out[c - 20..c + 20].iter().map(|s| s.abs()).sum::<f32>();
        let dry = around(100);
        let wet = around(740);
        assert!(wet > 0.2 * dry && wet < 0.4 * dry, "dry={dry} wet={wet}");
        assert!(out[1500].abs() < 1e-4);
    }

    #[test]
    fn fade_zeroes_ends() {
        let out = apply_fade(ones(8000), FS, 0.05);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[7999], 0.0);
        assert_eq!(out[4000], 1.0);
        assert!((out[200] - 200.0 / 399.0).abs() < 1e-6);
    }

    #[test]
    fn fade_is_clamped_for_short_segments() {
        let out = apply_fade(ones(100), FS, 0.05);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[99], 0.0);
        assert!(out[49] > 0.9 && out[50] > 0.9);
        assert_eq!(apply_fade(ones(1), FS, 0.05), vec![1.0]);
    }
}
