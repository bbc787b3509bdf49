//! Finding the closest blob in a depth image.
//!
//! Monocular depth estimators produce a dense map in which the nearest
//! obstacle shows up as a bright (or, for metric maps, dark) patch. The
//! finder keeps the closest few percent of pixels, groups them into
//! 8-connected components and reports the largest one, ready to be handed
//! to [`crate::boundary`].

use log::debug;
use serde::{Deserialize, Serialize};

use crate::boundary::{BoundaryInput, BoundingBox};
use crate::error::{Result, SenseNavError};

/// A row-major depth image. Non-finite samples mark pixels with no
/// estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DepthMap {
    /// Wraps `data`, which must hold exactly `width * height` samples.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width.checked_mul(height) != Some(data.len()) {
            return Err(SenseNavError::InvalidDepthMap(format!(
                "{width}x{height} needs {} samples, got {}",
                width.saturating_mul(height),
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.data[y * self.width + x])
    }

    /// Parses a map written as `(width: W, height: H, data: [...])` RON,
    /// rows first. `NaN` marks a missing sample.
    pub fn from_ron(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            width: usize,
            height: usize,
            data: Vec<f32>,
        }
        let raw: Raw = ron::de::from_str(text)?;
        Self::new(raw.width, raw.height, raw.data)
    }
}

/// Tuning for [`find_closest_region`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOptions {
    /// Larger values are closer (inverse depth, as estimators emit);
    /// `false` for metric maps where smaller is closer
    pub inverse_depth: bool,
    /// Share of finite pixels, in percent, kept as the closest band
    pub top_percent: f64,
    /// Smallest component, in pixels, that counts as an obstacle
    pub min_area: usize,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            inverse_depth: true,
            top_percent: 1.0,
            min_area: 50,
        }
    }
}

/// A pixel rectangle, `(x, y)` being its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    /// Left column
    pub x: usize,
    /// Top row
    pub y: usize,
    /// Columns covered
    pub width: usize,
    /// Rows covered
    pub height: usize,
}

/// The closest region found in a depth map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRegion {
    /// Centroid column, rounded
    pub cx: usize,
    /// Centroid row, rounded
    pub cy: usize,
    /// Depth at the centroid, or the median of the box if that is missing
    pub depth: f32,
    /// Pixels in the region
    pub area: usize,
    /// Extent of the region
    pub bbox: PixelBox,
}

impl DepthRegion {
    /// Describes the region as a camera-detected obstacle in an image of
    /// `image_width` x `image_height` pixels.
    pub fn to_boundary_input(&self, image_width: usize, image_height: usize, focal_length: Option<f64>) -> BoundaryInput {
        BoundaryInput {
            bbox: BoundingBox {
                x: self.bbox.x as f64,
                y: self.bbox.y as f64,
                width: self.bbox.width as f64,
                height: self.bbox.height as f64,
            },
            depth_value: self.depth as f64,
            image_width: image_width as f64,
            image_height: image_height as f64,
            focal_length,
        }
    }
}

/// Linear-interpolated `p`-th percentile of `values`, which must be sorted
/// and non-empty.
fn percentile(sorted: &[f32], p: f64) -> f32 {
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    Some(percentile(&values, 50.0))
}

/// Running statistics of one connected component.
struct Component {
    area: usize,
    sum_x: f64,
    sum_y: f64,
    min: (usize, usize),
    max: (usize, usize),
}

impl Component {
    fn new(x: usize, y: usize) -> Self {
        Self {
            area: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            min: (x, y),
            max: (x, y),
        }
    }

    fn add(&mut self, x: usize, y: usize) {
        self.area += 1;
        self.sum_x += x as f64;
        self.sum_y += y as f64;
        self.min = (self.min.0.min(x), self.min.1.min(y));
        self.max = (self.max.0.max(x), self.max.1.max(y));
    }
}

/// Labels the 8-connected components of `mask` and returns them in
/// scan order.
fn components(mask: &[bool], width: usize, height: usize) -> Vec<Component> {
    let mut seen = vec![false; mask.len()];
    let mut found = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || seen[start] {
            continue;
        }
        let mut component = Component::new(start % width, start / width);
        seen[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            component.add(x, y);
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let n = ny * width + nx;
                    if mask[n] && !seen[n] {
                        seen[n] = true;
                        stack.push(n);
                    }
                }
            }
        }
        found.push(component);
    }
    found
}

/// Finds the largest connected patch among the closest `top_percent` of
/// pixels.
///
/// Returns `None` when the map has no finite samples, is flat, or its
/// largest patch is smaller than `min_area`.
pub fn find_closest_region(map: &DepthMap, options: &RegionOptions) -> Option<DepthRegion> {
    let mut finite: Vec<f32> = map.data.iter().copied().filter(|d| d.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f32::total_cmp);
    let (lo, hi) = (finite[0], finite[finite.len() - 1]);
    if hi - lo < 1e-6 {
        return None;
    }

    let closeness = |d: f32| if options.inverse_depth { d } else { -d };
    if !options.inverse_depth {
        finite = finite.into_iter().rev().map(|d| -d).collect();
    }
    let threshold = percentile(&finite, 100.0 - options.top_percent);

    let mask: Vec<bool> = map
        .data
        .iter()
        .map(|&d| d.is_finite() && closeness(d) >= threshold)
        .collect();

    // first of equally large components wins
    let best = components(&mask, map.width, map.height)
        .into_iter()
        .reduce(|best, c| if c.area > best.area { c } else { best })?;
    debug!(
        "depth region : threshold {threshold:.4}, largest area {} px",
        best.area
    );
    if best.area < options.min_area {
        return None;
    }

    let cx = (best.sum_x / best.area as f64).round() as usize;
    let cy = (best.sum_y / best.area as f64).round() as usize;
    let bbox = PixelBox {
        x: best.min.0,
        y: best.min.1,
        width: best.max.0 - best.min.0 + 1,
        height: best.max.1 - best.min.1 + 1,
    };

    let depth = match map.get(cx, cy) {
        Some(d) if d.is_finite() => d,
        _ => {
            let roi: Vec<f32> = (bbox.y..bbox.y + bbox.height)
                .flat_map(|y| (bbox.x..bbox.x + bbox.width).map(move |x| (x, y)))
                .filter_map(|(x, y)| map.get(x, y))
                .filter(|d| d.is_finite())
                .collect();
            median(roi).unwrap_or(f32::NAN)
        }
    };

    Some(DepthRegion {
        cx,
        cy,
        depth,
        area: best.area,
        bbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `w` x `h` map of `background` with `value` painted over each rect.
    fn map_with(w: usize, h: usize, background: f32, rects: &[(usize, usize, usize, usize, f32)]) -> DepthMap {
        let mut data = vec![background; w * h];
        for &(x0, y0, rw, rh, value) in rects {
            for y in y0..y0 + rh {
                for x in x0..x0 + rw {
                    data[y * w + x] = value;
                }
            }
        }
        DepthMap::new(w, h, data).unwrap()
    }

    fn loose() -> RegionOptions {
        RegionOptions {
            top_percent: 10.0,
            ..RegionOptions::default()
        }
    }

    #[test]
    fn dimensions_must_match() {
        assert!(DepthMap::new(3, 3, vec![0.0; 8]).is_err());
        assert!(DepthMap::new(0, 0, vec![]).is_ok());
    }

    #[test]
    fn bright_blob_is_found() {
        let map = map_with(40, 30, 1.0, &[(10, 5, 11, 11, 5.0)]);
        let region = find_closest_region(&map, &loose()).unwrap();
        assert_eq!(region.area, 121);
        assert_eq!((region.cx, region.cy), (15, 10));
        assert_eq!(
            region.bbox,
            PixelBox {
                x: 10,
                y: 5,
                width: 11,
                height: 11
            }
        );
        assert_eq!(region.depth, 5.0);
    }

    #[test]
    fn metric_maps_look_for_small_values() {
        let map = map_with(40, 30, 4.0, &[(25, 12, 10, 10, 0.8)]);
        let options = RegionOptions {
            inverse_depth: false,
            top_percent: 5.0,
            ..RegionOptions::default()
        };
        let region = find_closest_region(&map, &options).unwrap();
        assert_eq!(region.area, 100);
        assert_eq!(region.bbox.x, 25);
        assert_eq!(region.depth, 0.8);
    }

    #[test]
    fn largest_component_wins() {
        let map = map_with(40, 30, 1.0, &[(2, 2, 8, 8, 5.0), (25, 15, 10, 10, 5.0)]);
        let region = find_closest_region(&map, &RegionOptions { top_percent: 12.0, ..loose() }).unwrap();
        assert_eq!(region.area, 100);
        assert_eq!(region.bbox.x, 25);
    }

    #[test]
    fn diagonal_neighbours_connect() {
        let mut data = vec![0.0; 100];
        for i in 0..10 {
            data[i * 10 + i] = 1.0;
        }
        let map = DepthMap::new(10, 10, data).unwrap();
        let options = RegionOptions {
            top_percent: 10.0,
            min_area: 10,
            ..RegionOptions::default()
        };
        let region = find_closest_region(&map, &options).unwrap();
        assert_eq!(region.area, 10);
        assert_eq!(region.bbox.width, 10);
    }

    #[test]
    fn degenerate_maps_give_nothing() {
        let flat = map_with(20, 20, 2.0, &[]);
        assert!(find_closest_region(&flat, &loose()).is_none());
        let blank = DepthMap::new(4, 4, vec![f32::NAN; 16]).unwrap();
        assert!(find_closest_region(&blank, &loose()).is_none());
        // blob too small for min_area
        let speck = map_with(40, 30, 1.0, &[(3, 3, 4, 4, 9.0)]);
        assert!(find_closest_region(&speck, &RegionOptions::default()).is_none());
    }

    #[test]
    fn missing_centroid_depth_falls_back_to_median() {
        let mut map = map_with(40, 30, 1.0, &[(10, 5, 11, 11, 5.0)]);
        map.data[10 * 40 + 15] = f32::NAN;
        let region = find_closest_region(&map, &loose()).unwrap();
        assert_eq!((region.cx, region.cy), (15, 10));
        assert_eq!(region.area, 120);
        assert_eq!(region.depth, 5.0);
    }

    #[test]
    fn region_feeds_boundary_processing() {
        let map = map_with(320, 240, 0.1, &[(100, 50, 80, 60, 0.9)]);
        let options = RegionOptions {
            top_percent: 5.0,
            ..RegionOptions::default()
        };
        let region = find_closest_region(&map, &options).unwrap();
        let input = region.to_boundary_input(320, 240, None);
        assert_eq!(input.bbox.x, 100.0);
        assert_eq!(input.bbox.width, 80.0);
        assert!((input.depth_value - 0.9).abs() < 1e-6);
        let analysis = crate::boundary::process_boundary_obstacle(&input).unwrap();
        assert!(!analysis.obstacles.is_empty());
    }

    #[test]
    fn percentile_interpolates() {
        let v = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(percentile(&v, 0.0), 0.0);
        assert_eq!(percentile(&v, 100.0), 3.0);
        assert!((percentile(&v, 50.0) - 1.5).abs() < 1e-6);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn map_parses_from_ron() {
        let map = DepthMap::from_ron("(width: 3, height: 2, data: [0.1, 0.2, 0.3, 0.4, NaN, 0.6])").unwrap();
        assert_eq!((map.width(), map.height()), (3, 2));
        assert_eq!(map.get(2, 1), Some(0.6));
        assert!(map.get(1, 1).unwrap().is_nan());

        assert!(matches!(
            DepthMap::from_ron("(width: 3, height: 3, data: [0.1])"),
            Err(SenseNavError::InvalidDepthMap(_))
        ));
        assert!(matches!(
            DepthMap::from_ron("(width: 3)"),
            Err(SenseNavError::RonSpannedError(_))
        ));
    }
}
