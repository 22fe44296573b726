//! Text region detection module
//!
//! Binarizes a grayscale frame with a local mean threshold and extracts the
//! outer boundaries of the resulting foreground blobs. Dark ink on a lighter
//! background becomes foreground.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use tracing::debug;

/// Configuration for adaptive binarization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Side length of the square neighborhood used for the local mean (odd)
    pub block_size: u32,
    /// Constant subtracted from the local mean
    pub bias: i32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            bias: 2,
        }
    }
}

/// Finds candidate text boundaries in grayscale frames
#[derive(Debug, Clone, Default)]
pub struct RegionDetector {
    config: DetectorConfig,
}

impl RegionDetector {
    /// Create a detector with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with custom parameters
    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Get the detector configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect outer contours of foreground regions, in raster scan order.
    ///
    /// Hole borders and borders nested inside other blobs are dropped. A frame
    /// without any foreground yields an empty list.
    pub fn detect(&self, gray: &GrayImage) -> Vec<Contour<u32>> {
        let binary = adaptive_threshold_inv(gray, self.config.block_size, self.config.bias);

        let contours: Vec<Contour<u32>> = find_contours::<u32>(&binary)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| !c.points.is_empty())
            .collect();

        debug!(
            "Region detection on {}x{} frame: {} outer contours",
            gray.width(),
            gray.height(),
            contours.len()
        );

        contours
    }
}

/// Inverted mean adaptive threshold.
///
/// A pixel becomes foreground (255) when it is not brighter than the rounded
/// mean of its `block_size x block_size` neighborhood minus `bias`, and
/// background (0) otherwise. Edge pixels are replicated past the borders.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, bias: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let radius = (block_size.max(1) / 2) as i64;
    let side = (2 * radius + 1) as u64;
    let count = side * side;

    // Column sums over the rows of the current window, one entry per x
    let mut window = vec![0u64; width as usize];
    let mut row = vec![0u32; width as usize];

    for dy in -radius..=radius {
        replicated_row_sums(gray, clamp_index(dy, height), radius, &mut row);
        for (acc, value) in window.iter_mut().zip(&row) {
            *acc += *value as u64;
        }
    }

    for y in 0..height {
        for x in 0..width {
            let mean = ((window[x as usize] * 2 + count) / (2 * count)) as i64;
            let value = gray.get_pixel(x, y)[0] as i64;

            if value - mean <= -(bias as i64) {
                out.put_pixel(x, y, Luma([255]));
            }
        }

        if y + 1 < height {
            let entering = clamp_index(y as i64 + 1 + radius, height);
            let leaving = clamp_index(y as i64 - radius, height);

            replicated_row_sums(gray, entering, radius, &mut row);
            for (acc, value) in window.iter_mut().zip(&row) {
                *acc += *value as u64;
            }
            replicated_row_sums(gray, leaving, radius, &mut row);
            for (acc, value) in window.iter_mut().zip(&row) {
                *acc -= *value as u64;
            }
        }
    }

    out
}

fn clamp_index(i: i64, len: u32) -> u32 {
    i.clamp(0, len as i64 - 1) as u32
}

/// Horizontal window sums of row `y`, edge pixels replicated
fn replicated_row_sums(gray: &GrayImage, y: u32, radius: i64, out: &mut [u32]) {
    let width = gray.width();
    let px = |x: i64| gray.get_pixel(clamp_index(x, width), y)[0] as u32;

    let mut sum: u32 = (-radius..=radius).map(&px).sum();
    out[0] = sum;
    for x in 1..width as i64 {
        sum += px(x + radius);
        sum -= px(x - 1 - radius);
        out[x as usize] = sum;
    }
}
