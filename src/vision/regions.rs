//! Region ranking and selection
//!
//! Turns raw contours into bounding rectangles, drops the small ones and
//! keeps the largest few in descending area order.

use imageproc::contours::Contour;
use imageproc::point::Point;

/// Default minimum contour area (pixels²); regions must be strictly larger
pub const DEFAULT_MIN_AREA: f64 = 1000.0;

/// Default maximum number of regions passed to OCR per frame
pub const DEFAULT_MAX_REGIONS: usize = 5;

/// Axis-aligned candidate text region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Enclosed area of the source contour, used for filtering and ranking
    pub area: f64,
}

impl Region {
    /// Build a region from a contour's points
    pub fn from_contour(contour: &Contour<u32>) -> Option<Self> {
        let points = &contour.points;
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;

        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            area: polygon_area(points),
        })
    }

    /// Get bounding box as (x, y, width, height)
    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}

/// Selection limits for candidate regions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    /// Regions with area at or below this are discarded
    pub min_area: f64,
    /// Maximum number of regions kept
    pub max_regions: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            max_regions: DEFAULT_MAX_REGIONS,
        }
    }
}

/// Rank contours by area and keep the largest ones.
///
/// Equal areas keep detection order.
pub fn select_regions(contours: &[Contour<u32>], config: &SelectionConfig) -> Vec<Region> {
    let mut regions: Vec<Region> = contours
        .iter()
        .filter_map(Region::from_contour)
        .filter(|r| r.area > config.min_area)
        .collect();

    // sort_by is stable
    regions.sort_by(|a, b| b.area.total_cmp(&a.area));
    regions.truncate(config.max_regions);
    regions
}

/// Enclosed area of a closed polygon (shoelace formula)
pub fn polygon_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let doubled: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    doubled.abs() as f64 / 2.0
}
