//! Sector classification of point clouds.
//!
//! Space around the listener is cut into six [`Sector`]s. Each point is
//! converted to spherical coordinates in the body frame (x forward, y left,
//! z up) and bucketed; within every bucket only the nearest point survives,
//! which gives at most one [`Obstacle`] per sector.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, f64::consts::PI, fmt};

use crate::error::{Result, SenseNavError};

/// Angles are carried in radians throughout the crate.
pub type Radian = f64;

/// Half-width of the "level" band. Points further above or below ear level
/// than this are UP or DOWN regardless of their horizontal direction.
pub const ELEVATION_DEADBAND: Radian = 25.0 * PI / 180.0;

/// A point in the listener's body frame, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    /// Forward
    pub x: f64,
    /// Left
    pub y: f64,
    /// Up
    pub z: f64,
}

impl Point3D {
    /// Builds a point from its three coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance from the listener.
    pub fn range(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Horizontal angle from straight ahead, positive to the left.
    pub fn azimuth(&self) -> Radian {
        self.y.atan2(self.x)
    }

    /// Vertical angle from ear level, positive up.
    pub fn elevation(&self) -> Radian {
        self.z.atan2(self.x.hypot(self.y))
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3D {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// One of the six fixed regions around the listener.
///
/// The declaration order doubles as the stable tie-break order used by the
/// salience ranker and as the iteration order of a [`SectorMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sector {
    /// Front-left
    FL,
    /// Front-right
    FR,
    /// Back-left
    BL,
    /// Back-right
    BR,
    /// Above the elevation deadband
    UP,
    /// Below the elevation deadband
    DOWN,
}

impl Sector {
    /// Every sector, in declaration order.
    pub const ALL: [Sector; 6] = [
        Sector::FL,
        Sector::FR,
        Sector::BL,
        Sector::BR,
        Sector::UP,
        Sector::DOWN,
    ];

    /// Index into per-sector lookup tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The short name used on the wire, e.g. `"FL"`.
    pub const fn name(self) -> &'static str {
        match self {
            Sector::FL => "FL",
            Sector::FR => "FR",
            Sector::BL => "BL",
            Sector::BR => "BR",
            Sector::UP => "UP",
            Sector::DOWN => "DOWN",
        }
    }

    /// Decides which sector a direction falls in. `forward` is the sign test
    /// on x, which the angles alone cannot recover at the poles.
    pub fn classify(forward: bool, azimuth: Radian, elevation: Radian) -> Option<Sector> {
        if elevation >= ELEVATION_DEADBAND {
            Some(Sector::UP)
        } else if elevation <= -ELEVATION_DEADBAND {
            Some(Sector::DOWN)
        } else if elevation.abs() < ELEVATION_DEADBAND {
            let left = azimuth >= 0.0;
            Some(match (forward, left) {
                (true, true) => Sector::FL,
                (true, false) => Sector::FR,
                (false, true) => Sector::BL,
                (false, false) => Sector::BR,
            })
        } else {
            // NaN elevation
            None
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The nearest point found in a sector, in spherical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Sector the point was bucketed into
    pub sector: Sector,
    /// Distance from the listener, meters
    pub distance: f64,
    /// Azimuth in (-pi, pi], positive left
    pub azimuth: Radian,
    /// Elevation in [-pi/2, pi/2], positive up
    pub elevation: Radian,
}

impl Obstacle {
    /// Back to the body frame, for clients that want to draw markers.
    pub fn position(&self) -> Point3D {
        let flat = self.distance * self.elevation.cos();
        Point3D {
            x: flat * self.azimuth.cos(),
            y: flat * self.azimuth.sin(),
            z: self.distance * self.elevation.sin(),
        }
    }
}

/// Result of a classification: at most one [`Obstacle`] per [`Sector`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorMap {
    obstacles: BTreeMap<Sector, Obstacle>,
}

impl SectorMap {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sectors with an obstacle.
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    /// True when nothing was detected.
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// The obstacle in `sector`, if any.
    pub fn get(&self, sector: Sector) -> Option<&Obstacle> {
        self.obstacles.get(&sector)
    }

    /// True when `sector` holds an obstacle.
    pub fn contains(&self, sector: Sector) -> bool {
        self.obstacles.contains_key(&sector)
    }

    /// Obstacles in sector declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    /// Keeps `obstacle` if its sector is empty or it is strictly closer than
    /// what is already there.
    pub fn offer(&mut self, obstacle: Obstacle) {
        self.obstacles
            .entry(obstacle.sector)
            .and_modify(|held| {
                if obstacle.distance < held.distance {
                    *held = obstacle;
                }
            })
            .or_insert(obstacle);
    }

    /// The globally nearest obstacle. Earlier sectors win ties.
    pub fn closest(&self) -> Option<&Obstacle> {
        self.iter().fold(None, |best: Option<&Obstacle>, o| match best {
            Some(b) if b.distance <= o.distance => Some(b),
            _ => Some(o),
        })
    }
}

impl FromIterator<Obstacle> for SectorMap {
    fn from_iter<T: IntoIterator<Item = Obstacle>>(iter: T) -> Self {
        let mut map = SectorMap::new();
        for o in iter {
            map.offer(o);
        }
        map
    }
}

/// Buckets `points` into sectors and keeps the nearest point per sector.
///
/// With `ignore_behind`, points with `x <= 0` are dropped before
/// classification. An empty or fully filtered cloud yields an empty map.
pub fn nearest_by_sector(points: &[Point3D], ignore_behind: bool) -> SectorMap {
    points
        .iter()
        .filter(|p| !ignore_behind || p.x > 0.0)
        .filter_map(|p| {
            let azimuth = p.azimuth();
            let elevation = p.elevation();
            Sector::classify(p.x > 0.0, azimuth, elevation).map(|sector| Obstacle {
                sector,
                distance: p.range(),
                azimuth,
                elevation,
            })
        })
        .collect()
}

/// A validated collection of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointCloud {
    points: Vec<Point3D>,
}

impl PointCloud {
    /// Validates raw `[x, y, z]` rows. Rows must have exactly three finite
    /// coordinates.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let points = rows
            .iter()
            .enumerate()
            .map(|(i, row)| match row.as_slice() {
                &[x, y, z] => {
                    let p = Point3D { x, y, z };
                    if p.is_finite() {
                        Ok(p)
                    } else {
                        Err(SenseNavError::InvalidPointCloud(format!(
                            "point {i} has a non-finite coordinate"
                        )))
                    }
                }
                other => Err(SenseNavError::InvalidPointCloud(format!(
                    "point {i} has {} coordinates, expected 3",
                    other.len()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { points })
    }

    /// Reads a RON list of `[x, y, z]` rows, e.g. `[[2.0, 1.5, 0.0]]`.
    pub fn from_ron(text: &str) -> Result<Self> {
        let rows: Vec<Vec<f64>> = ron::de::from_str(text)?;
        Self::from_rows(&rows)
    }

    /// Drops points closer than `min` or further than `max` from the origin.
    pub fn filter_by_distance(self, min: f64, max: f64) -> Self {
        let points = self
            .points
            .into_iter()
            .filter(|p| (min..=max).contains(&p.range()))
            .collect();
        Self { points }
    }

    /// The points, in input order.
    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True for a cloud with no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<Point3D>> for PointCloud {
    fn from(points: Vec<Point3D>) -> Self {
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(p: [f64; 3]) -> SectorMap {
        nearest_by_sector(&[p.into()], false)
    }

    fn only_sector(map: &SectorMap) -> Sector {
        assert_eq!(map.len(), 1);
        map.iter().next().unwrap().sector
    }

    #[test]
    fn front_left_scenario() {
        let map = single([2.0, 1.5, 0.0]);
        let fl = map.get(Sector::FL).unwrap();
        assert!((fl.distance - 2.5).abs() < 1e-9);
        assert!((fl.azimuth - 0.6435).abs() < 1e-4);
        assert_eq!(fl.elevation, 0.0);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn horizontal_quadrants() {
        assert_eq!(only_sector(&single([2.0, 1.5, 0.0])), Sector::FL);
        assert_eq!(only_sector(&single([2.0, -1.5, 0.0])), Sector::FR);
        assert_eq!(only_sector(&single([-2.0, 1.5, 0.0])), Sector::BL);
        assert_eq!(only_sector(&single([-2.0, -1.5, 0.0])), Sector::BR);
    }

    #[test]
    fn straight_ahead_counts_as_left() {
        // az == 0 sits on the FL side of the split
        assert_eq!(only_sector(&single([1.0, 0.0, 0.0])), Sector::FL);
        // x == 0 is "behind"
        assert_eq!(only_sector(&single([0.0, 1.0, 0.0])), Sector::BL);
    }

    #[test]
    fn elevation_overrides_direction() {
        assert_eq!(only_sector(&single([1.5, 0.0, 2.0])), Sector::UP);
        assert_eq!(only_sector(&single([-1.5, -1.0, 2.0])), Sector::UP);
        assert_eq!(only_sector(&single([1.5, 0.0, -1.0])), Sector::DOWN);
        assert_eq!(only_sector(&single([-0.5, 0.5, -3.0])), Sector::DOWN);
    }

    #[test]
    fn deadband_edge_goes_up() {
        let el = ELEVATION_DEADBAND;
        let p = Point3D::new(el.cos(), 0.0, el.sin());
        let map = nearest_by_sector(&[p], false);
        let sector = only_sector(&map);
        // floating point may land a hair either side of 25 degrees
        assert!(sector == Sector::UP || sector == Sector::FL);
        let inside = Point3D::new(1.0, 0.0, (24.0f64).to_radians().tan());
        assert_eq!(only_sector(&nearest_by_sector(&[inside], false)), Sector::FL);
        let above = Point3D::new(1.0, 0.0, (26.0f64).to_radians().tan());
        assert_eq!(only_sector(&nearest_by_sector(&[above], false)), Sector::UP);
    }

    #[test]
    fn keeps_nearest_per_sector() {
        let points: Vec<Point3D> = vec![
            [3.0, 1.0, 0.0].into(),
            [1.0, 0.5, 0.0].into(),
            [2.0, 2.0, 0.0].into(),
            [-1.0, -1.0, 0.0].into(),
        ];
        let map = nearest_by_sector(&points, false);
        assert_eq!(map.len(), 2);
        let fl = map.get(Sector::FL).unwrap();
        assert!((fl.distance - 1.25f64.sqrt()).abs() < 1e-9);
        assert!(map.contains(Sector::BR));
    }

    #[test]
    fn at_most_one_per_sector() {
        let points: Vec<Point3D> = (0..200)
            .map(|i| {
                let a = i as f64 * 0.37;
                Point3D::new(a.cos() * 2.0, a.sin() * 2.0, (a * 1.3).sin() * 2.0)
            })
            .collect();
        let map = nearest_by_sector(&points, false);
        assert!(map.len() <= 6);
        let mut sectors: Vec<Sector> = map.iter().map(|o| o.sector).collect();
        sectors.dedup();
        assert_eq!(sectors.len(), map.len());
    }

    #[test]
    fn empty_and_filtered_clouds() {
        assert!(nearest_by_sector(&[], false).is_empty());
        let behind: Vec<Point3D> = vec![[-1.0, 0.2, 0.0].into(), [0.0, -1.0, 0.0].into()];
        assert!(nearest_by_sector(&behind, true).is_empty());
        assert_eq!(nearest_by_sector(&behind, false).len(), 2);
    }

    #[test]
    fn closest_picks_global_minimum() {
        let points: Vec<Point3D> = vec![
            [2.0, 1.5, 0.0].into(),
            [-0.5, -0.5, 0.0].into(),
            [1.0, 0.0, 3.0].into(),
        ];
        let map = nearest_by_sector(&points, false);
        assert_eq!(map.closest().unwrap().sector, Sector::BR);
        assert!(SectorMap::new().closest().is_none());
    }

    #[test]
    fn position_round_trips_direction() {
        let map = single([1.0, -2.0, 0.5]);
        let o = map.iter().next().unwrap();
        let p = o.position();
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y + 2.0).abs() < 1e-9);
        assert!((p.z - 0.5).abs() < 1e-9);
    }

    #[test]
    fn point_cloud_validation() {
        let ok = PointCloud::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(ok.len(), 1);
        assert!(PointCloud::from_rows(&[vec![1.0, 2.0]]).is_err());
        assert!(PointCloud::from_rows(&[vec![1.0, f64::NAN, 0.0]]).is_err());
        assert!(PointCloud::from_rows(&[]).unwrap().is_empty());
    }

    #[test]
    fn point_cloud_from_ron() {
        let cloud = PointCloud::from_ron("[[2.0, 1.5, 0.0], [0.0, 0.0, 9.0]]").unwrap();
        assert_eq!(cloud.len(), 2);
        let near = cloud.filter_by_distance(0.1, 5.0);
        assert_eq!(near.points(), &[Point3D::new(2.0, 1.5, 0.0)]);
    }
}
