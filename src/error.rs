//! The error type shared by every fallible operation in the crate.

use std::{borrow::Cow, error::Error, fmt};

/// Everything that can go wrong between reading obstacle data and writing a
/// rendered cue. The audio core itself is infallible pure math; these come
/// from input validation and the I/O collaborators around it.
#[derive(Debug)]
pub enum SenseNavError {
    /// Returned when a bounding box has a non-positive width or height.
    InvalidBoundingBox {
        /// Width of the rejected box, in pixels
        width: f64,
        /// Height of the rejected box, in pixels
        height: f64,
    },

    /// Returned when a point cloud contains something other than finite
    /// `[x, y, z]` triples.
    InvalidPointCloud(String),

    /// Returned when the camera description cannot project pixels, e.g. a
    /// zero-sized image or a non-positive focal length.
    InvalidCamera(String),

    /// Returned when a depth map's data does not match its dimensions.
    InvalidDepthMap(String),

    /// Returned when a configuration value cannot be rendered with, e.g. a
    /// zero sample rate.
    InvalidConfig(String),

    /// Returned when a serial line is not a binary sensor reading.
    SensorDecode(String),

    /// Returned when io fails when reading or writing files or ports.
    IoError(std::io::Error),

    /// Returned when serialization of a config or report fails.
    RonError(ron::Error),

    /// Returned when deserialization of a config or point file fails.
    RonSpannedError(ron::de::SpannedError),

    /// Returned when the WAV sink fails.
    HoundError(hound::Error),
}

impl fmt::Display for SenseNavError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SenseNavError as SNE;
        let msg = match self {
            SNE::InvalidBoundingBox { width, height } => Cow::from(format!(
                "invalid bounding box: width and height must be positive, got {width}x{height}"
            )),
            SNE::InvalidPointCloud(why) => Cow::from(format!("invalid point cloud: {why}")),
            SNE::InvalidCamera(why) => Cow::from(format!("invalid camera: {why}")),
            SNE::InvalidDepthMap(why) => Cow::from(format!("invalid depth map: {why}")),
            SNE::InvalidConfig(why) => Cow::from(format!("invalid configuration: {why}")),
            SNE::SensorDecode(line) => Cow::from(format!("unable to decode sensor line {line:?}")),
            SNE::IoError(error) => Cow::from(format!("io error: {}", error)),
            SNE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            SNE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
            SNE::HoundError(error) => Cow::from(format!("wav error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl Error for SenseNavError {}

impl From<std::io::Error> for SenseNavError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::Error> for SenseNavError {
    fn from(value: ron::Error) -> Self {
        Self::RonError(value)
    }
}

impl From<ron::de::SpannedError> for SenseNavError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

impl From<hound::Error> for SenseNavError {
    fn from(value: hound::Error) -> Self {
        Self::HoundError(value)
    }
}

/// Shorthand used across the crate.
pub type Result<T> = std::result::Result<T, SenseNavError>;
