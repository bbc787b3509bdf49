//! Obstacle prioritization.
//!
//! Only a few cues can be told apart by ear at once, so obstacles are scored
//! for urgency and the renderer only gets a short, ordered prefix.

use serde::{Deserialize, Serialize};

use crate::geometry::{Obstacle, Radian, SectorMap, ELEVATION_DEADBAND};

/// How many targets are picked when the caller doesn't say.
pub const DEFAULT_MAX_TARGETS: usize = 3;

const MIN_RANGE: f64 = 1e-6;
const ELEVATION_BONUS: f64 = 0.1;

/// Urgency of an obstacle at `(r, az, el)`. Inverse distance dominates, a
/// frontal bias adds up to 30% and obstacles outside the level band get a
/// flat bonus.
pub fn obstacle_score(r: f64, az: Radian, el: Radian) -> f64 {
    let frontal = az.cos().max(0.0);
    let bonus = if el.abs() > ELEVATION_DEADBAND {
        ELEVATION_BONUS
    } else {
        0.0
    };
    (1.0 / r.max(MIN_RANGE)) * (0.7 + 0.3 * frontal) + bonus
}

/// An obstacle selected for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// 1-based position in the ranking
    pub rank: usize,
    /// Salience score
    pub score: f64,
    /// The ranked obstacle
    pub obstacle: Obstacle,
}

/// Ranks every obstacle by [`obstacle_score`], highest first. Ties keep the
/// sector declaration order.
pub fn rank_obstacles(picked: &SectorMap) -> Vec<Target> {
    let mut scored: Vec<(f64, Obstacle)> = picked
        .iter()
        .map(|o| (obstacle_score(o.distance, o.azimuth, o.elevation), *o))
        .collect();
    // `sort_by` is stable, and the map iterates in sector order
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, obstacle))| Target {
            rank: i + 1,
            score,
            obstacle,
        })
        .collect()
}

/// The first `max_targets` entries of [`rank_obstacles`].
pub fn choose_targets(picked: &SectorMap, max_targets: usize) -> Vec<Target> {
    let mut ranked = rank_obstacles(picked);
    ranked.truncate(max_targets);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{nearest_by_sector, Point3D, Sector};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    #[test]
    fn score_decreases_with_distance() {
        for &(az, el) in &[(0.0, 0.0), (1.0, 0.1), (-2.5, 0.0), (0.3, 0.9)] {
            let mut last = f64::INFINITY;
            for i in 1..60 {
                let r = i as f64 * 0.1;
                let s = obstacle_score(r, az, el);
                assert!(s < last, "r={r} az={az} el={el}");
                last = s;
            }
        }
    }

    #[test]
    fn score_peaks_straight_ahead() {
        let ahead = obstacle_score(2.0, 0.0, 0.0);
        for i in 1..36 {
            let az = i as f64 * PI / 36.0;
            assert!(obstacle_score(2.0, az, 0.0) < ahead);
            assert!(obstacle_score(2.0, -az, 0.0) < ahead);
        }
        // nothing extra for being behind rather than beside
        let side = obstacle_score(2.0, PI / 2.0, 0.0);
        let back = obstacle_score(2.0, PI, 0.0);
        assert!((side - back).abs() < 1e-12);
    }

    #[test]
    fn elevation_bonus_is_flat() {
        let level = obstacle_score(2.0, 0.0, 0.0);
        let raised = obstacle_score(2.0, 0.0, 0.6);
        assert!((raised - level - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zero_distance_does_not_divide_by_zero() {
        assert!(obstacle_score(0.0, 0.0, 0.0).is_finite());
    }

    #[test]
    fn choose_targets_is_bounded_sorted_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let points: Vec<Point3D> = (0..40)
                .map(|_| {
                    Point3D::new(
                        rng.gen_range(-4.0..4.0),
                        rng.gen_range(-4.0..4.0),
                        rng.gen_range(-2.0..2.0),
                    )
                })
                .collect();
            let picked = nearest_by_sector(&points, false);
            let full = rank_obstacles(&picked);
            for k in 0..=7 {
                let chosen = choose_targets(&picked, k);
                assert!(chosen.len() <= k);
                assert_eq!(chosen.len(), k.min(picked.len()));
                assert_eq!(&full[..chosen.len()], &chosen[..]);
                assert!(chosen.windows(2).all(|w| w[0].score >= w[1].score));
                assert!(chosen.iter().enumerate().all(|(i, t)| t.rank == i + 1));
            }
        }
    }

    #[test]
    fn ties_keep_sector_order() {
        // mirror images score identically
        let points: Vec<Point3D> = vec![[2.0, -1.0, 0.0].into(), [2.0, 1.0, 0.0].into()];
        let ranked = rank_obstacles(&nearest_by_sector(&points, false));
        assert_eq!(ranked[0].obstacle.sector, Sector::FL);
        assert_eq!(ranked[1].obstacle.sector, Sector::FR);
    }

    #[test]
    fn empty_map_has_no_targets() {
        assert!(choose_targets(&SectorMap::new(), DEFAULT_MAX_TARGETS).is_empty());
    }
}
