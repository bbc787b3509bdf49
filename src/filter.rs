//! Butterworth IIR filters built from cascaded biquads.
//!
//! All filtering in the crate is zero-phase: the cascade runs forward, then
//! backward over the time-reversed output, so cues are not smeared in time
//! and the interaural delay added by the panner stays exact.

use std::f64::consts::PI;

/// Filter memory for one biquad section (direct form I).
#[derive(Debug, Clone, Copy, Default)]
struct FilterState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

/// A single second-order section, normalized so that `a0 == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

/// Keeps cutoffs strictly inside (0, Nyquist) so the design never blows up.
/// A sample rate with no usable band gives zero.
fn normalized_omega(cutoff: f64, sample_rate: f64) -> f64 {
    let nyquist = sample_rate / 2.0;
    if !(nyquist > 1e-3) {
        return 0.0;
    }
    let cutoff = cutoff.clamp(1e-3, nyquist * 0.95);
    2.0 * PI * cutoff / sample_rate
}

impl Biquad {
    /// Low-pass section with quality factor `q`.
    pub fn lowpass(cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = normalized_omega(cutoff, sample_rate);
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::normalize(
            (1.0 - cos) / 2.0,
            1.0 - cos,
            (1.0 - cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    /// High-pass section with quality factor `q`.
    pub fn highpass(cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = normalized_omega(cutoff, sample_rate);
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::normalize(
            (1.0 + cos) / 2.0,
            -(1.0 + cos),
            (1.0 + cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    fn run(&self, signal: &mut [f64]) {
        let mut s = FilterState::default();
        for x in signal.iter_mut() {
            let y = self.b0 * *x + self.b1 * s.x1 + self.b2 * s.x2 - self.a1 * s.y1 - self.a2 * s.y2;
            s.x2 = s.x1;
            s.x1 = *x;
            s.y2 = s.y1;
            s.y1 = y;
            *x = y;
        }
    }
}

/// Quality factors of the biquads making up an `order`-pole Butterworth
/// filter. Odd orders are rounded up.
fn butterworth_qs(order: usize) -> Vec<f64> {
    let n = (order.max(2) + 1) / 2 * 2;
    (0..n / 2)
        .map(|k| 1.0 / (2.0 * ((2 * k + 1) as f64 * PI / (2 * n) as f64).cos()))
        .collect()
}

/// A cascade of biquads applied as one filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    stages: Vec<Biquad>,
}

impl Cascade {
    /// Butterworth low-pass of the given (even) order.
    pub fn butter_lowpass(order: usize, cutoff: f64, sample_rate: f64) -> Self {
        let stages = butterworth_qs(order)
            .into_iter()
            .map(|q| Biquad::lowpass(cutoff, q, sample_rate))
            .collect();
        Self { stages }
    }

    /// Butterworth high-pass of the given (even) order.
    pub fn butter_highpass(order: usize, cutoff: f64, sample_rate: f64) -> Self {
        let stages = butterworth_qs(order)
            .into_iter()
            .map(|q| Biquad::highpass(cutoff, q, sample_rate))
            .collect();
        Self { stages }
    }

    /// Band-pass between `low` and `high`, as a high-pass into a low-pass of
    /// the given order each.
    pub fn butter_bandpass(order: usize, low: f64, high: f64, sample_rate: f64) -> Self {
        let mut stages = Self::butter_highpass(order, low, sample_rate).stages;
        stages.extend(Self::butter_lowpass(order, high, sample_rate).stages);
        Self { stages }
    }

    fn run(&self, signal: &mut [f64]) {
        for stage in &self.stages {
            stage.run(signal);
        }
    }

    /// Zero-phase filtering: forward pass, backward pass. The ends are padded
    /// with an odd reflection to tame start-up transients.
    pub fn filtfilt(&self, signal: &[f32]) -> Vec<f32> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }
        let pad = (3 * (2 * self.stages.len() + 1)).min(n - 1);
        let first = signal[0] as f64;
        let last = signal[n - 1] as f64;

        let mut ext: Vec<f64> = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i] as f64));
        ext.extend(signal.iter().map(|&s| s as f64));
        ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i] as f64));

        self.run(&mut ext);
        ext.reverse();
        self.run(&mut ext);
        ext.reverse();

        ext[pad..pad + n].iter().map(|&s| s as f32).collect()
    }
}
