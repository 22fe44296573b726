//! OCR (Optical Character Recognition) module
//!
//! Crops candidate regions out of a frame, normalizes them to the size the
//! OCR engine expects and runs recognition. Tesseract is the default engine.

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat};
use rusty_tesseract::{Args, Image};
use tracing::{debug, info};

use super::regions::Region;

/// Anything that turns an image into text
pub trait TextRecognizer: Send {
    /// Recognize text in a grayscale image
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// Tesseract settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractConfig {
    /// Tesseract language pack (e.g. "chi_sim", "eng")
    pub language: String,
    /// Page segmentation mode
    pub psm: i32,
    /// Resolution hint passed to tesseract
    pub dpi: i32,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            language: "chi_sim".to_string(),
            psm: 3,
            dpi: 150,
        }
    }
}

/// OCR engine backed by the tesseract binary
pub struct TesseractOcr {
    args: Args,
}

impl TesseractOcr {
    /// Create a new Tesseract engine
    pub fn new(config: &TesseractConfig) -> Result<Self> {
        info!("Initializing Tesseract OCR with language: {}", config.language);

        let args = Args {
            lang: config.language.clone(),
            psm: Some(config.psm),
            dpi: Some(config.dpi),
            ..Args::default()
        };

        Ok(Self { args })
    }

    /// Get the configured language
    pub fn language(&self) -> &str {
        &self.args.lang
    }
}

impl TextRecognizer for TesseractOcr {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        // rusty-tesseract hands files to the tesseract binary
        let file = tempfile::Builder::new()
            .prefix("screen-translator-")
            .suffix(".png")
            .tempfile()
            .context("Failed to create OCR scratch file")?;

        image
            .save_with_format(file.path(), ImageFormat::Png)
            .context("Failed to write OCR scratch image")?;

        let input = Image::from_path(file.path())
            .map_err(|e| anyhow!("Failed to load OCR input: {}", e))?;

        rusty_tesseract::image_to_string(&input, &self.args)
            .map_err(|e| anyhow!("Tesseract failed: {}", e))
    }
}

/// What to do when OCR fails for one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrErrorPolicy {
    /// Log and leave the region out of the frame text
    #[default]
    SkipRegion,
    /// Fail the whole frame
    FailFrame,
}

/// Runs OCR on single regions of a frame
pub struct RegionRecognizer {
    engine: Box<dyn TextRecognizer>,
    /// Canonical (width, height) every crop is resized to
    target_size: (u32, u32),
}

impl RegionRecognizer {
    /// Create a recognizer around an OCR engine
    pub fn new(engine: Box<dyn TextRecognizer>, target_size: (u32, u32)) -> Self {
        Self {
            engine,
            target_size,
        }
    }

    /// Canonical crop size as (width, height)
    pub fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    /// Crop the region, resize it and recognize its text (trimmed)
    pub fn recognize(&self, gray: &GrayImage, region: &Region) -> Result<String> {
        let crop = crop_region(gray, region);
        if crop.width() == 0 || crop.height() == 0 {
            return Ok(String::new());
        }

        let (width, height) = self.target_size;
        let resized = imageops::resize(&crop, width, height, FilterType::Triangle);

        let text = self.engine.recognize(&resized)?;
        let text = text.trim().to_string();

        debug!(
            "OCR region {:?} -> {} chars",
            region.bounds(),
            text.chars().count()
        );

        Ok(text)
    }
}

/// Copy a region out of the frame, clamped to the frame bounds
pub fn crop_region(gray: &GrayImage, region: &Region) -> GrayImage {
    let (img_w, img_h) = gray.dimensions();
    let x = region.x.min(img_w);
    let y = region.y.min(img_h);
    let width = region.width.min(img_w - x);
    let height = region.height.min(img_h - y);

    imageops::crop_imm(gray, x, y, width, height).to_image()
}
