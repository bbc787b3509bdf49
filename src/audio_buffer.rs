//! The stereo buffer handed between rendering stages and, finally, to a sink.

/// Number of whole frames in `secs` seconds at `sample_rate`. A tiny bias
/// keeps products like `2.3 * 48000` from flooring one frame short.
pub fn frames_for(sample_rate: u32, secs: f64) -> usize {
    if secs <= 0.0 {
        return 0;
    }
    (sample_rate as f64 * secs + 1e-9).floor() as usize
}

/// Converts a level in dBFS to a linear amplitude.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Two equally long channels of `f32` samples at a fixed rate.
///
/// Stages take buffers by value and return new ones, so a buffer always has
/// exactly one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl AudioBuffer {
    /// `frames` frames of silence.
    pub fn silence(sample_rate: u32, frames: usize) -> Self {
        Self {
            sample_rate,
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// `secs` seconds of silence.
    pub fn silence_secs(sample_rate: u32, secs: f64) -> Self {
        Self::silence(sample_rate, frames_for(sample_rate, secs))
    }

    /// Wraps two channels. The longer one is truncated if they disagree.
    pub fn from_channels(sample_rate: u32, mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        Self {
            sample_rate,
            left,
            right,
        }
    }

    /// The same signal on both channels.
    pub fn dual_mono(sample_rate: u32, mono: &[f32]) -> Self {
        Self {
            sample_rate,
            left: mono.to_vec(),
            right: mono.to_vec(),
        }
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Left channel.
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Right channel.
    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Gives the channels back, e.g. to a sink.
    pub fn into_channels(self) -> (Vec<f32>, Vec<f32>) {
        (self.left, self.right)
    }

    /// `(left, right)` pairs in time order.
    pub fn frames(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.left.iter().copied().zip(self.right.iter().copied())
    }

    /// Largest absolute sample over both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// True if every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.left.iter().chain(self.right.iter()).all(|&s| s == 0.0)
    }

    /// Multiplies every sample by `gain`.
    pub fn scale(&mut self, gain: f32) {
        for s in self.left.iter_mut().chain(self.right.iter_mut()) {
            *s *= gain;
        }
    }

    /// Scales the buffer down so its peak is `ceiling`, if it is louder.
    pub fn limit_peak(&mut self, ceiling: f32) {
        let peak = self.peak();
        if peak > ceiling {
            self.scale(ceiling / peak);
        }
    }

    /// Appends `other` to the end of this buffer.
    pub fn append(&mut self, other: AudioBuffer) {
        let (left, right) = other.into_channels();
        self.left.extend(left);
        self.right.extend(right);
    }

    /// Truncates or zero-pads to exactly `frames` frames.
    pub fn resize(&mut self, frames: usize) {
        self.left.resize(frames, 0.0);
        self.right.resize(frames, 0.0);
    }

    /// Copies `other` over this buffer starting at frame `start`. Whatever
    /// doesn't fit is dropped.
    pub fn overwrite_at(&mut self, start: usize, other: &AudioBuffer) {
        if start >= self.len() {
            return;
        }
        let n = other.len().min(self.len() - start);
        self.left[start..start + n].copy_from_slice(&other.left[..n]);
        self.right[start..start + n].copy_from_slice(&other.right[..n]);
    }

    /// Sums `other` into this buffer, growing it with zeros if `other` is
    /// longer.
    pub fn mix(&mut self, other: &AudioBuffer) {
        if other.len() > self.len() {
            self.resize(other.len());
        }
        for (dst, src) in self.left.iter_mut().zip(&other.left) {
            *dst += src;
        }
        for (dst, src) in self.right.iter_mut().zip(&other.right) {
            *dst += src;
        }
    }
}

/// Sums stems of possibly unequal length (shorter ones zero-padded) and
/// scales the mix down if it peaks above `limit_db` dBFS. No stems gives an
/// empty buffer.
pub fn mix_and_limit(sample_rate: u32, stems: &[AudioBuffer], limit_db: f32) -> AudioBuffer {
    let mut mix = AudioBuffer::silence(sample_rate, 0);
    for stem in stems {
        mix.mix(stem);
    }
    mix.limit_peak(db_to_linear(limit_db));
    mix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_counts_do_not_lose_a_sample() {
        assert_eq!(frames_for(48000, 2.3), 110_400);
        assert_eq!(frames_for(48000, 0.3), 14_400);
        assert_eq!(frames_for(44100, 0.05), 2205);
        assert_eq!(frames_for(48000, -1.0), 0);
    }

    #[test]
    fn frames_pair_left_with_right() {
        let buf = AudioBuffer::from_channels(10, vec![1.0, 2.0], vec![-1.0, -2.0]);
        assert_eq!(buf.frames().collect::<Vec<_>>(), vec![(1.0, -1.0), (2.0, -2.0)]);
    }

    #[test]
    fn mismatched_channels_truncate() {
        let buf = AudioBuffer::from_channels(10, vec![1.0, 2.0, 3.0], vec![1.0]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn mix_pads_shorter_stems() {
        let a = AudioBuffer::dual_mono(10, &[0.1, 0.1]);
        let b = AudioBuffer::dual_mono(10, &[0.1, 0.1, 0.1, 0.1]);
        let mix = mix_and_limit(10, &[a, b], 0.0);
        assert_eq!(mix.len(), 4);
        assert!((mix.left()[0] - 0.2).abs() < 1e-6);
        assert!((mix.left()[3] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn mix_limits_to_ceiling() {
        let a = AudioBuffer::dual_mono(10, &[0.9, -0.9]);
        let b = AudioBuffer::dual_mono(10, &[0.9, 0.0]);
        let mix = mix_and_limit(10, &[a, b], -3.0);
        assert!((mix.peak() - db_to_linear(-3.0)).abs() < 1e-6);
        // quiet mixes are left alone
        let quiet = mix_and_limit(10, &[AudioBuffer::dual_mono(10, &[0.1])], -3.0);
        assert!((quiet.peak() - 0.1).abs() < 1e-7);
    }

    #[test]
    fn overwrite_clips_to_buffer() {
        let mut buf = AudioBuffer::silence(10, 4);
        buf.overwrite_at(2, &AudioBuffer::dual_mono(10, &[1.0, 1.0, 1.0]));
        assert_eq!(buf.left(), &[0.0, 0.0, 1.0, 1.0]);
        buf.overwrite_at(9, &AudioBuffer::dual_mono(10, &[5.0]));
        assert_eq!(buf.peak(), 1.0);
    }

    #[test]
    fn silence_is_silent() {
        let buf = AudioBuffer::silence_secs(8000, 0.5);
        assert_eq!(buf.len(), 4000);
        assert!(buf.is_silent());
        assert_eq!(buf.duration_secs(), 0.5);
    }
}
