//! Engine configuration, loaded from a [ron] file.
//!
//! Every field has a default, so a file only needs the values it changes:
//!
//! ```text
//! (
//!     max_targets: 4,
//!     render: (mode: unified, duration: 6.0, unified: (allocation: Salience)),
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::depth_region::RegionOptions;
use crate::error::{Result, SenseNavError};
use crate::geometry::{PointCloud, SectorMap};
use crate::params::DistanceRange;
use crate::report::analyze;
use crate::salience::{Target, DEFAULT_MAX_TARGETS};
use crate::sequencer::RenderConfig;

/// Settings for reading the sensor board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path; asked for interactively if absent
    pub port: Option<String>,
    /// Line speed
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
        }
    }
}

/// Everything tunable about the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Targets kept by the ranker
    pub max_targets: usize,
    /// Drop points behind the listener before classifying
    pub ignore_behind: bool,
    /// Points nearer or further than this are sensor noise and are dropped
    pub point_range: DistanceRange,
    /// Rendering settings
    pub render: RenderConfig,
    /// Depth-map region finding
    pub region: RegionOptions,
    /// Sensor board link
    pub serial: SerialConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_targets: DEFAULT_MAX_TARGETS,
            ignore_behind: false,
            point_range: DistanceRange { min: 0.1, max: 10.0 },
            render: RenderConfig::default(),
            region: RegionOptions::default(),
            serial: SerialConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from RON text and validates it.
    pub fn from_ron(text: &str) -> Result<Self> {
        let config: Self = ron::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a render depends on.
    pub fn validate(&self) -> Result<()> {
        if !self.point_range.is_valid() {
            let DistanceRange { min, max } = self.point_range;
            return Err(SenseNavError::InvalidConfig(format!(
                "point range {min}..{max} is not an ordered pair of distances"
            )));
        }
        self.render.validate()
    }

    /// Drops out-of-range points, then classifies and ranks what is left.
    pub fn analyze(&self, cloud: PointCloud) -> (SectorMap, Vec<Target>) {
        let DistanceRange { min, max } = self.point_range;
        analyze(&cloud.filter_by_distance(min, max), self.ignore_behind, self.max_targets)
    }

    /// Reads a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_ron(&fs::read_to_string(path)?)
    }

    /// Encodes the configuration as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}
