//! Screen Capture Layer
//!
//! Snapshots a monitor with xcap, optionally cropped to a fixed region.
//! This is a read-only operation that captures pixels without any game interaction.

pub mod frame;

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use xcap::Monitor;

use self::frame::CapturedFrame;

/// Rectangle to capture, relative to the monitor's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Screen capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Monitor to capture (0 = first monitor reported by the system)
    pub monitor_index: usize,
    /// Capture iterations per second
    pub max_fps: u32,
    /// Optional sub-region of the monitor; whole monitor when unset
    pub region: Option<CaptureRegion>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            monitor_index: 0,
            max_fps: 30,
            region: None,
        }
    }
}

impl CaptureConfig {
    /// Time between two capture iterations
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_fps.max(1) as f64)
    }
}

/// Source of frames for the capture loop
pub trait FrameSource {
    /// Grab the next frame
    fn next_frame(&mut self) -> Result<CapturedFrame>;
}

/// Basic monitor information for the CLI
#[derive(Debug, Clone)]
pub struct MonitorInfo {
    pub index: usize,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

/// List the monitors available for capture
pub fn list_monitors() -> Result<Vec<MonitorInfo>> {
    let monitors = Monitor::all().context("Failed to enumerate monitors")?;
    Ok(monitors
        .iter()
        .enumerate()
        .map(|(index, m)| MonitorInfo {
            index,
            name: m.name().to_string(),
            x: m.x(),
            y: m.y(),
            width: m.width(),
            height: m.height(),
            is_primary: m.is_primary(),
        })
        .collect())
}

/// Screen capture of one monitor
pub struct ScreenCapture {
    config: CaptureConfig,
    monitor: Monitor,
    next_sequence: u64,
}

impl ScreenCapture {
    /// Create a new screen capture instance for the configured monitor
    pub fn new(config: CaptureConfig) -> Result<Self> {
        let monitor = Monitor::all()
            .context("Failed to enumerate monitors")?
            .into_iter()
            .nth(config.monitor_index)
            .ok_or_else(|| anyhow!("Monitor {} not found", config.monitor_index))?;

        if let Some(region) = config.region {
            clamp_region(&region, monitor.width(), monitor.height()).ok_or_else(|| {
                anyhow!(
                    "Capture region {:?} lies outside monitor '{}' ({}x{})",
                    region,
                    monitor.name(),
                    monitor.width(),
                    monitor.height()
                )
            })?;
        }

        info!(
            "Capturing monitor {} '{}' ({}x{}), region: {:?}",
            config.monitor_index,
            monitor.name(),
            monitor.width(),
            monitor.height(),
            config.region
        );

        Ok(Self {
            config,
            monitor,
            next_sequence: 0,
        })
    }

    /// Capture one frame
    pub fn capture(&mut self) -> Result<CapturedFrame> {
        let shot = self
            .monitor
            .capture_image()
            .context("Failed to capture screen")?;

        // Rebuild with our own image version
        let (width, height) = (shot.width(), shot.height());
        let mut image = RgbaImage::from_raw(width, height, shot.into_raw())
            .ok_or_else(|| anyhow!("Captured buffer does not match {}x{}", width, height))?;

        if let Some(region) = self.config.region {
            let (x, y, w, h) = clamp_region(&region, width, height)
                .ok_or_else(|| anyhow!("Capture region {:?} lies outside the screen", region))?;
            image = imageops::crop_imm(&image, x, y, w, h).to_image();
        }

        let frame = CapturedFrame::new(image, self.next_sequence);
        self.next_sequence += 1;

        debug!("Captured frame {} ({:?})", frame.sequence, frame.dimensions());
        Ok(frame)
    }
}

impl FrameSource for ScreenCapture {
    fn next_frame(&mut self) -> Result<CapturedFrame> {
        self.capture()
    }
}

/// Clamp a region to a screen of the given size.
///
/// Returns `None` when nothing of the region is visible.
pub fn clamp_region(region: &CaptureRegion, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if region.x >= width || region.y >= height {
        return None;
    }

    let w = region.width.min(width - region.x);
    let h = region.height.min(height - region.y);
    if w == 0 || h == 0 {
        return None;
    }

    Some((region.x, region.y, w, h))
}
