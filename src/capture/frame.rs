//! Frame data structures for captured screen content

use image::RgbaImage;
use std::time::Instant;

/// A captured frame from the screen
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// RGBA pixel data
    pub image: RgbaImage,
    /// Capture sequence number (starts at 0)
    pub sequence: u64,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl CapturedFrame {
    /// Create a new captured frame
    pub fn new(image: RgbaImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
