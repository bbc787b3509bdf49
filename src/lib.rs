//! SenseNav turns the positions of nearby obstacles into short spatial
//! audio cues, so that someone who cannot see them can hear where they are
//! and how close they are.
//!
//! The pipeline is a chain of pure functions:
//!
//! 1. [`geometry`] buckets points around the listener into six sectors and
//!    keeps the nearest point in each.
//! 2. [`salience`] ranks those obstacles by urgency.
//! 3. [`params`] maps distance to pulse rate, pitch and loudness.
//! 4. [`synth`] and [`effects`] build each sector's distinctive tone.
//! 5. [`panner`] places the tone around the head.
//! 6. [`sequencer`] arranges the cues in time according to a [`sequencer::Mode`].
//!
//! Obstacles can come from a point cloud, from a bounding box in a camera
//! image ([`boundary`]) or from the closest blob in a depth map
//! ([`depth_region`]). The `sensenav` binary wraps all of this in a command
//! line tool that writes WAV files and reads the bump-sensor board.

#![warn(missing_docs)]
pub mod args;
pub mod audio_buffer;
pub mod boundary;
pub mod config;
pub mod depth_region;
pub mod dummy_cloud;
pub mod effects;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod panner;
pub mod params;
pub mod report;
pub mod salience;
pub mod sensor_decoder;
pub mod sequencer;
pub mod synth;
pub mod wav_writer;

pub use error::{Result, SenseNavError};
