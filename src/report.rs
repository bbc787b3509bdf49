//! Serializable summaries of an analysis, for display clients and for the
//! command line.
//!
//! Reports are plain data built from a [`SectorMap`] and its targets; they
//! are encoded with [serde] and [ron], e.g.
//!
//! ```text
//! (obstacles:{FL:(name:"Front-Left",distance:2.5,...)},targets:[...],total_obstacles:1)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::boundary::BoundaryAnalysis;
use crate::error::Result;
use crate::geometry::{nearest_by_sector, Obstacle, Point3D, PointCloud, Sector, SectorMap, ELEVATION_DEADBAND};
use crate::params::{distance_to_params_in, AudioParams, DistanceRange};
use crate::salience::{choose_targets, Target};

/// Everything a client needs to display one obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleEntry {
    /// Which sector it is in
    pub sector: Sector,
    /// Human readable sector name
    pub name: String,
    /// Meters
    pub distance: f64,
    /// Degrees, positive left
    pub azimuth_deg: f64,
    /// Degrees, positive up
    pub elevation_deg: f64,
    /// Radians, positive left
    pub azimuth_rad: f64,
    /// Radians, positive up
    pub elevation_rad: f64,
    /// Marker position in the body frame
    pub position: Point3D,
    /// What the obstacle sounds like
    pub audio_params: AudioParams,
}

impl ObstacleEntry {
    /// Describes `obstacle`, mapping its distance over `range`.
    pub fn new(obstacle: &Obstacle, range: &DistanceRange) -> Self {
        Self {
            sector: obstacle.sector,
            name: obstacle.sector.recipe().long_name.to_string(),
            distance: obstacle.distance,
            azimuth_deg: obstacle.azimuth.to_degrees(),
            elevation_deg: obstacle.elevation.to_degrees(),
            azimuth_rad: obstacle.azimuth,
            elevation_rad: obstacle.elevation,
            position: obstacle.position(),
            audio_params: distance_to_params_in(obstacle.distance, range),
        }
    }
}

/// One ranked target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEntry {
    /// 1-based rank
    pub rank: usize,
    /// Salience score
    pub score: f64,
    /// The obstacle itself
    pub obstacle: ObstacleEntry,
}

/// The outcome of classifying a point cloud or a boundary obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Nearest obstacle per sector
    pub obstacles: BTreeMap<Sector, ObstacleEntry>,
    /// Targets, most urgent first
    pub targets: Vec<TargetEntry>,
    /// Number of occupied sectors
    pub total_obstacles: usize,
    /// Perimeter samples, for boundary analyses only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_points: Option<Vec<Point3D>>,
}

impl AnalysisReport {
    /// Builds a report from a classification and its targets.
    pub fn new(picked: &SectorMap, targets: &[Target], range: &DistanceRange) -> Self {
        let obstacles = picked
            .iter()
            .map(|o| (o.sector, ObstacleEntry::new(o, range)))
            .collect();
        let targets = targets
            .iter()
            .map(|t| TargetEntry {
                rank: t.rank,
                score: t.score,
                obstacle: ObstacleEntry::new(&t.obstacle, range),
            })
            .collect();
        Self {
            obstacles,
            targets,
            total_obstacles: picked.len(),
            boundary_points: None,
        }
    }

    /// Builds a report for a boundary obstacle, keeping its perimeter.
    pub fn from_boundary(analysis: &BoundaryAnalysis, range: &DistanceRange) -> Self {
        Self {
            boundary_points: Some(analysis.boundary_points.clone()),
            ..Self::new(&analysis.obstacles, &analysis.targets, range)
        }
    }

    /// Encodes the report as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}

/// Classifies `cloud` and picks up to `max_targets` targets.
pub fn analyze(cloud: &PointCloud, ignore_behind: bool, max_targets: usize) -> (SectorMap, Vec<Target>) {
    let picked = nearest_by_sector(cloud.points(), ignore_behind);
    let targets = choose_targets(&picked, max_targets);
    (picked, targets)
}

/// Static description of one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorInfo {
    /// The sector
    pub sector: Sector,
    /// Human readable name
    pub name: String,
    /// What its cue sounds like
    pub description: String,
}

/// The sector layout and distance range, for clients drawing legends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorTable {
    /// One entry per sector, in declaration order
    pub sectors: Vec<SectorInfo>,
    /// Half-width of the level band, degrees
    pub elevation_deadband_deg: f64,
    /// Distances over which cues change
    pub distance_range: DistanceRange,
}

impl SectorTable {
    /// The table for cues mapped over `range`.
    pub fn new(range: DistanceRange) -> Self {
        let sectors = Sector::ALL
            .iter()
            .map(|&sector| {
                let recipe = sector.recipe();
                SectorInfo {
                    sector,
                    name: recipe.long_name.to_string(),
                    description: recipe.description.to_string(),
                }
            })
            .collect();
        Self {
            sectors,
            elevation_deadband_deg: ELEVATION_DEADBAND.to_degrees(),
            distance_range: range,
        }
    }

    /// Encodes the table as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}

impl Default for SectorTable {
    fn default() -> Self {
        Self::new(DistanceRange::default())
    }
}
