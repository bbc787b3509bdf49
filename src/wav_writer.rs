//! A wrapper for the hound library that writes rendered cues to WAV files.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::audio_buffer::AudioBuffer;
use crate::error::{Result, SenseNavError};

const BITS_PER_SAMPLE: u16 = 32;

/// The format every sink writes: stereo 32-bit float.
pub fn stereo_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Float,
    }
}

/// Streams [`AudioBuffer`]s into a WAV file.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
}

impl WavSink {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let writer = WavWriter::create(path, stereo_spec(sample_rate))?;
        Ok(Self { writer, sample_rate })
    }

    /// Appends `buffer`, which must be at the sink's sample rate.
    pub fn write(&mut self, buffer: &AudioBuffer) -> Result<()> {
        if buffer.sample_rate() != self.sample_rate {
            return Err(SenseNavError::HoundError(hound::Error::Unsupported));
        }
        for (left, right) in buffer.frames() {
            self.writer.write_sample(left)?;
            self.writer.write_sample(right)?;
        }
        // keep the header valid after each write
        self.writer.flush()?;
        Ok(())
    }

    /// Finishes the file. Dropping the sink does the same, but without
    /// reporting errors.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

/// Writes `buffer` to a new WAV file at `path`.
pub fn write_wav(path: impl AsRef<Path>, buffer: &AudioBuffer) -> Result<()> {
    let path = path.as_ref();
    let mut sink = WavSink::create(path, buffer.sample_rate())?;
    sink.write(buffer)?;
    sink.finalize()?;
    debug!(
        "Wrote {:.2} s of audio to {}",
        buffer.duration_secs(),
        path.display()
    );
    Ok(())
}

/// Reads a stereo float WAV file, as written by [`WavSink`].
pub fn read_wav(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec != stereo_spec(spec.sample_rate) {
        return Err(SenseNavError::HoundError(hound::Error::Unsupported));
    }
    let samples = reader
        .samples::<f32>()
        .collect::<std::result::Result<Vec<f32>, hound::Error>>()?;
    let left = samples.iter().copied().step_by(2).collect();
    let right = samples.iter().copied().skip(1).step_by(2).collect();
    Ok(AudioBuffer::from_channels(spec.sample_rate, left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMP_RATE: u32 = 44100;

    fn sine(frames: usize, freq: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * PI * freq * i as f32 / SAMP_RATE as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cue.wav");

        let buffer = AudioBuffer::from_channels(SAMP_RATE, sine(100, 261.61), sine(100, 440.0));
        write_wav(&path, &buffer).unwrap();

        let back = read_wav(&path).unwrap();
        assert_eq!(back, buffer);
    }

    #[test]
    fn sink_appends_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.wav");

        let mut sink = WavSink::create(&path, SAMP_RATE).unwrap();
        sink.write(&AudioBuffer::dual_mono(SAMP_RATE, &sine(50, 300.0))).unwrap();
        sink.write(&AudioBuffer::silence(SAMP_RATE, 25)).unwrap();
        sink.finalize().unwrap();

        let back = read_wav(&path).unwrap();
        assert_eq!(back.len(), 75);
        assert_eq!(back.left(), back.right());
        assert!(back.left()[50..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sample_rate_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = WavSink::create(dir.path().join("x.wav"), 48000).unwrap();
        assert!(sink.write(&AudioBuffer::silence(SAMP_RATE, 10)).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_wav(dir.path().join("nothing.wav")).is_err());
    }
}
