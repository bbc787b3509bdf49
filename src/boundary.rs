//! Obstacles given as a 2D bounding box in a camera image plus a depth.
//!
//! Points are sampled along the box perimeter in pixel space, normalized
//! through a pinhole camera with the depth kept as z, and classified like
//! any other point cloud.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SenseNavError};
use crate::geometry::{nearest_by_sector, Point3D, SectorMap};
use crate::salience::{choose_targets, Target, DEFAULT_MAX_TARGETS};

/// Perimeter samples used by [`process_boundary_obstacle`].
pub const DEFAULT_BOUNDARY_POINTS: usize = 16;

/// An axis aligned box in image pixels; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge, px
    pub x: f64,
    /// Top edge, px
    pub y: f64,
    /// px
    pub width: f64,
    /// px
    pub height: f64,
}

impl BoundingBox {
    fn validate(&self) -> Result<()> {
        if self.width > 0.0 && self.height > 0.0 {
            Ok(())
        } else {
            Err(SenseNavError::InvalidBoundingBox {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Samples `num_points` points along the perimeter of `bbox`, all at
/// `depth` in the z coordinate.
///
/// Each edge gets `max(1, num_points / 4)` evenly spaced points, corners
/// included, or the edge midpoint when there is only one. Edges are walked
/// top left to right, right top to bottom, bottom right to left, then left
/// bottom to top.
pub fn generate_boundary_points(bbox: &BoundingBox, depth: f64, num_points: usize) -> Result<Vec<Point3D>> {
    bbox.validate()?;
    let per_edge = (num_points / 4).max(1);
    let BoundingBox {
        x,
        y,
        width: w,
        height: h,
    } = *bbox;

    // fraction along an edge for the i-th sample
    let t = |i: usize| {
        if per_edge == 1 {
            0.5
        } else {
            i as f64 / (per_edge - 1) as f64
        }
    };

    let mut points = Vec::with_capacity(4 * per_edge);
    points.extend((0..per_edge).map(|i| Point3D::new(x + w * t(i), y, depth)));
    points.extend((0..per_edge).map(|i| Point3D::new(x + w, y + h * t(i), depth)));
    points.extend((0..per_edge).map(|i| Point3D::new(x + w - w * t(i), y + h, depth)));
    points.extend((0..per_edge).map(|i| Point3D::new(x, y + h - h * t(i), depth)));
    Ok(points)
}

/// A camera-detected obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryInput {
    /// Where the obstacle is in the image
    pub bbox: BoundingBox,
    /// Distance along the optical axis, meters
    pub depth_value: f64,
    /// px
    pub image_width: f64,
    /// px
    pub image_height: f64,
    /// Focal length in px; `max(image_width, image_height)` if absent
    #[serde(default)]
    pub focal_length: Option<f64>,
}

impl BoundaryInput {
    fn focal(&self) -> Result<f64> {
        let f = self
            .focal_length
            .unwrap_or_else(|| self.image_width.max(self.image_height));
        if f > 0.0 && f.is_finite() {
            Ok(f)
        } else {
            Err(SenseNavError::InvalidCamera(format!(
                "focal length must be positive, got {f}"
            )))
        }
    }

    /// Projects a pixel-space point `(px, py, depth)` to
    /// `((px - cx) / f, (py - cy) / f, depth)`, with the principal point
    /// `(cx, cy)` at the image center.
    pub fn project(&self, pixel: &Point3D) -> Result<Point3D> {
        let f = self.focal()?;
        let (cx, cy) = (self.image_width / 2.0, self.image_height / 2.0);
        Ok(Point3D::new((pixel.x - cx) / f, (pixel.y - cy) / f, pixel.z))
    }
}

/// What [`process_boundary_obstacle`] found.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryAnalysis {
    /// Nearest perimeter point per sector
    pub obstacles: SectorMap,
    /// Ranked targets among them
    pub targets: Vec<Target>,
    /// Perimeter samples in pixel space, z holding the depth
    pub boundary_points: Vec<Point3D>,
}

/// Classifies a camera-detected obstacle by its perimeter.
pub fn process_boundary_obstacle(input: &BoundaryInput) -> Result<BoundaryAnalysis> {
    process_boundary_obstacle_with(input, DEFAULT_MAX_TARGETS)
}

/// [`process_boundary_obstacle`] keeping up to `max_targets` targets.
pub fn process_boundary_obstacle_with(input: &BoundaryInput, max_targets: usize) -> Result<BoundaryAnalysis> {
    if input.image_width <= 0.0 || input.image_height <= 0.0 {
        return Err(SenseNavError::InvalidCamera(format!(
            "image must have a positive size, got {}x{}",
            input.image_width, input.image_height
        )));
    }
    let boundary_points = generate_boundary_points(&input.bbox, input.depth_value, DEFAULT_BOUNDARY_POINTS)?;
    let body = boundary_points
        .iter()
        .map(|p| input.project(p))
        .collect::<Result<Vec<_>>>()?;

    let obstacles = nearest_by_sector(&body, false);
    if obstacles.is_empty() {
        warn!("No sector contains a perimeter point of {:?}", input.bbox);
    }
    let targets = choose_targets(&obstacles, max_targets);
    debug!(
        "boundary : {} perimeter points -> {} sector(s), {} target(s)",
        boundary_points.len(),
        obstacles.len(),
        targets.len()
    );
    Ok(BoundaryAnalysis {
        obstacles,
        targets,
        boundary_points,
    })
}
