//! Shared application state between the worker and the display

use std::time::Instant;

use crate::config::AppConfig;

/// Central shared state between the runtime threads
#[derive(Debug, Clone, Default)]
pub struct SharedAppState {
    /// Application configuration
    pub config: AppConfig,
    /// Text currently shown by the display
    pub display: DisplayText,
    /// Runtime state (not persisted)
    pub runtime: RuntimeState,
}

impl SharedAppState {
    /// Create a new shared state with the given configuration
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            display: DisplayText::default(),
            runtime: RuntimeState::default(),
        }
    }

    /// Replace the displayed text with a finished translation
    pub fn publish_translation(&mut self, sequence: u64, source: String, translated: String) {
        self.display = DisplayText {
            source_text: source,
            translated_text: translated,
            frame_sequence: Some(sequence),
            updated_at: Some(Instant::now()),
        };
        self.runtime.frames_translated += 1;
        self.runtime.clear_error();
    }

    /// Clear the displayed text because a frame contained none
    pub fn publish_empty(&mut self, sequence: u64) {
        self.display = DisplayText {
            frame_sequence: Some(sequence),
            updated_at: Some(Instant::now()),
            ..Default::default()
        };
        self.runtime.clear_error();
    }
}

/// The latest completed translation
#[derive(Debug, Clone, Default)]
pub struct DisplayText {
    /// Recognized text that was translated
    pub source_text: String,
    /// Translated text drawn on screen
    pub translated_text: String,
    /// Frame the text came from
    pub frame_sequence: Option<u64>,
    /// When the text was published
    pub updated_at: Option<Instant>,
}

/// Runtime state that is not persisted
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Whether the capture loop is running
    pub is_capturing: bool,
    /// Frames captured
    pub frames_captured: u64,
    /// Frames dropped because the worker was busy
    pub frames_dropped: u64,
    /// Frames that went through the pipeline
    pub frames_processed: u64,
    /// Frames whose translation was published
    pub frames_translated: u64,
    /// Failed screen captures
    pub capture_failures: u64,
    /// Frames where recognition failed
    pub ocr_failures: u64,
    /// Failed translation requests
    pub translation_failures: u64,
    /// Pipeline time of the last processed frame
    pub last_processing_ms: u64,
    /// Last error message (if any)
    pub last_error: Option<String>,
}

impl RuntimeState {
    /// Clear any error state
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Set an error message
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}
