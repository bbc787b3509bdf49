//! Made-up point clouds for demos and tests, standing in for a depth
//! camera or LiDAR.

use rand::prelude::*;
use std::f64::consts::PI;
use std::fmt;

use crate::geometry::{Point3D, PointCloud, Radian};

/// A named, fixed arrangement of obstacles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    /// Short identifier, usable on the command line
    pub slug: &'static str,
    /// What the listener should hear
    pub description: &'static str,
    /// Obstacle positions in the body frame
    pub points: &'static [[f64; 3]],
}

impl Scenario {
    /// The scenario's points as a cloud.
    pub fn cloud(&self) -> PointCloud {
        self.points
            .iter()
            .map(|&p| Point3D::from(p))
            .collect::<Vec<_>>()
            .into()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description, self.slug)
    }
}

/// Single obstacles in each sector, then a few crowded scenes.
pub const SCENARIOS: [Scenario; 9] = [
    Scenario {
        slug: "front-left",
        description: "Front-left obstacle",
        points: &[[2.0, 1.5, 0.0]],
    },
    Scenario {
        slug: "front-right",
        description: "Front-right obstacle",
        points: &[[2.0, -1.5, 0.0]],
    },
    Scenario {
        slug: "back-left",
        description: "Back-left obstacle",
        points: &[[-2.0, 1.5, 0.0]],
    },
    Scenario {
        slug: "back-right",
        description: "Back-right obstacle",
        points: &[[-2.0, -1.5, 0.0]],
    },
    Scenario {
        slug: "overhead",
        description: "Overhead obstacle",
        points: &[[1.5, 0.0, 2.0]],
    },
    Scenario {
        slug: "underground",
        description: "Underground obstacle",
        points: &[[1.5, 0.0, -1.0]],
    },
    Scenario {
        slug: "front-corners",
        description: "Multiple obstacles, front corners",
        points: &[[2.0, 1.5, 0.0], [2.5, -1.2, 0.0]],
    },
    Scenario {
        slug: "all-corners",
        description: "Multiple obstacles, all corners",
        points: &[
            [2.0, 1.5, 0.0],
            [2.5, -1.2, 0.0],
            [-1.8, 1.0, 0.0],
            [-2.2, -0.8, 0.0],
        ],
    },
    Scenario {
        slug: "complex-3d",
        description: "Complex 3D scene",
        points: &[
            [1.5, 1.0, 0.0],
            [-2.0, -1.0, 0.0],
            [1.0, 0.0, 2.5],
            [2.0, 0.0, -0.8],
        ],
    },
];

/// Looks a scenario up by slug.
pub fn scenario(slug: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.slug == slug)
}

/// `num_points` points evenly spaced on a level ring of radius `range`,
/// each nudged by up to `noise` meters in every axis. The same `seed`
/// always gives the same cloud.
pub fn random_ring(num_points: usize, range: f64, noise: f64, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = |rng: &mut StdRng| {
        if noise > 0.0 {
            rng.gen_range(-noise..noise)
        } else {
            0.0
        }
    };
    (0..num_points)
        .map(|v| -> Radian { (v as f64 / num_points as f64) * 2.0 * PI })
        .map(|angle| {
            Point3D::new(
                angle.cos() * range + jitter(&mut rng),
                angle.sin() * range + jitter(&mut rng),
                jitter(&mut rng),
            )
        })
        .collect::<Vec<_>>()
        .into()
}

/// `num_points` points scattered uniformly in direction, between `min_range`
/// and `max_range` meters away.
pub fn random_scatter(num_points: usize, min_range: f64, max_range: f64, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_points)
        .map(|_| {
            let az: Radian = rng.gen_range(-PI..PI);
            // uniform on the sphere
            let el: Radian = rng.gen_range(-1.0f64..1.0).asin();
            let r = if max_range > min_range {
                rng.gen_range(min_range..max_range)
            } else {
                min_range
            };
            Point3D::new(r * el.cos() * az.cos(), r * el.cos() * az.sin(), r * el.sin())
        })
        .collect::<Vec<_>>()
        .into()
}
