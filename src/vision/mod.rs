//! Vision/OCR Layer
//!
//! Turns a captured frame into text:
//! grayscale -> region detection -> region selection -> per-region OCR -> join.

pub mod detection;
pub mod ocr;
pub mod regions;

use anyhow::Result;
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::capture::frame::CapturedFrame;

pub use detection::{DetectorConfig, RegionDetector};
pub use ocr::{OcrErrorPolicy, RegionRecognizer, TesseractConfig, TesseractOcr, TextRecognizer};
pub use regions::{select_regions, Region, SelectionConfig};

/// Configuration for the vision pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Neighborhood size for adaptive thresholding (odd)
    pub threshold_block_size: u32,
    /// Constant subtracted from the neighborhood mean
    pub threshold_bias: i32,
    /// Regions must have an area strictly above this (pixels²)
    pub min_region_area: f64,
    /// Maximum number of regions recognized per frame
    pub max_regions: usize,
    /// Tesseract language pack
    pub ocr_language: String,
    /// Tesseract page segmentation mode
    pub ocr_psm: i32,
    /// Tesseract resolution hint
    pub ocr_dpi: i32,
    /// Width every region is resized to before OCR
    pub ocr_width: u32,
    /// Height every region is resized to before OCR
    pub ocr_height: u32,
    /// Behavior when OCR fails on a region
    pub ocr_error_policy: OcrErrorPolicy,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            threshold_block_size: 11,
            threshold_bias: 2,
            min_region_area: regions::DEFAULT_MIN_AREA,
            max_regions: regions::DEFAULT_MAX_REGIONS,
            ocr_language: "chi_sim".to_string(),
            ocr_psm: 3,
            ocr_dpi: 150,
            ocr_width: 500,
            ocr_height: 200,
            ocr_error_policy: OcrErrorPolicy::SkipRegion,
        }
    }
}

impl VisionConfig {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            block_size: self.threshold_block_size,
            bias: self.threshold_bias,
        }
    }

    pub fn selection_config(&self) -> SelectionConfig {
        SelectionConfig {
            min_area: self.min_region_area,
            max_regions: self.max_regions,
        }
    }

    pub fn tesseract_config(&self) -> TesseractConfig {
        TesseractConfig {
            language: self.ocr_language.clone(),
            psm: self.ocr_psm,
            dpi: self.ocr_dpi,
        }
    }
}

/// Text recognized in one region
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedRegion {
    /// Source region
    pub region: Region,
    /// Trimmed OCR output
    pub text: String,
}

/// Result of running the pipeline on one frame
#[derive(Debug, Clone)]
pub struct FrameText {
    /// Region texts joined in rank order
    pub text: String,
    /// Per-region results, largest region first
    pub regions: Vec<RecognizedRegion>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl FrameText {
    /// Whether no text was recognized
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Frame-to-text pipeline
///
/// Holds only configuration and the OCR engine; calls are independent.
pub struct FramePipeline {
    detector: RegionDetector,
    selection: SelectionConfig,
    recognizer: RegionRecognizer,
    error_policy: OcrErrorPolicy,
}

impl FramePipeline {
    /// Create a pipeline backed by Tesseract
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let engine = TesseractOcr::new(&config.tesseract_config())?;
        Ok(Self::with_engine(config, Box::new(engine)))
    }

    /// Create a pipeline around any OCR engine
    pub fn with_engine(config: &VisionConfig, engine: Box<dyn TextRecognizer>) -> Self {
        Self {
            detector: RegionDetector::with_config(config.detector_config()),
            selection: config.selection_config(),
            recognizer: RegionRecognizer::new(engine, (config.ocr_width, config.ocr_height)),
            error_policy: config.ocr_error_policy,
        }
    }

    /// Process a captured frame
    pub fn process_frame(&self, frame: &CapturedFrame) -> Result<FrameText> {
        self.process_gray(&to_grayscale(&frame.image))
    }

    /// Process an image of any color type
    pub fn process(&self, image: &DynamicImage) -> Result<FrameText> {
        match image {
            DynamicImage::ImageLuma8(gray) => self.process_gray(gray),
            other => self.process_gray(&to_grayscale(&other.to_rgba8())),
        }
    }

    /// Process a grayscale image
    pub fn process_gray(&self, gray: &GrayImage) -> Result<FrameText> {
        let start = Instant::now();

        let contours = self.detector.detect(gray);
        let selected = select_regions(&contours, &self.selection);

        let mut recognized = Vec::with_capacity(selected.len());
        for region in selected {
            match self.recognizer.recognize(gray, &region) {
                Ok(text) => recognized.push(RecognizedRegion { region, text }),
                Err(e) => match self.error_policy {
                    OcrErrorPolicy::SkipRegion => {
                        warn!("OCR failed for region {:?}, skipping: {:#}", region.bounds(), e);
                    }
                    OcrErrorPolicy::FailFrame => {
                        return Err(e.context(format!("OCR failed for region {:?}", region.bounds())));
                    }
                },
            }
        }

        let text = aggregate_text(recognized.iter().map(|r| r.text.as_str()));
        let processing_time = start.elapsed();

        debug!(
            "Frame processed in {:?}: {} contours, {} regions, {} chars",
            processing_time,
            contours.len(),
            recognized.len(),
            text.chars().count()
        );

        Ok(FrameText {
            text,
            regions: recognized,
            processing_time_ms: processing_time.as_millis() as u64,
        })
    }
}

/// Join region texts with single spaces, keeping their order
pub fn aggregate_text<'a, I>(texts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().collect::<Vec<_>>().join(" ")
}

/// Convert RGBA image data to grayscale
pub fn to_grayscale(rgba: &RgbaImage) -> GrayImage {
    let mut gray = GrayImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, _] = pixel.0;
        // Standard luminance weights
        let value = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8;
        gray.put_pixel(x, y, Luma([value]));
    }

    gray
}
