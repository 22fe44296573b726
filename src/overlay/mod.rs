//! Display Layer
//!
//! Shows the latest translation centered in a window. The window repaints at
//! the capture cadence and never waits on OCR or translation; it only reads
//! whatever the worker published last.

pub mod widgets;

use anyhow::{anyhow, Context, Result};
use egui::{Align2, FontData, FontDefinitions, FontFamily, FontId, Pos2};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::overlay::widgets::TextStyle;
use crate::shared::SharedAppState;

/// Display window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Window title
    pub title: String,
    /// Window width in points
    pub width: f32,
    /// Window height in points
    pub height: f32,
    /// Font size of the translated text
    pub font_size: f32,
    /// Text color (RGB)
    pub text_color: [u8; 3],
    /// Background color (RGB)
    pub background_color: [u8; 3],
    /// Font file to use for the text (e.g. a CJK font for untranslated text)
    pub font_path: Option<PathBuf>,
    /// Show capture/translation counters in the corner
    pub show_status: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "Game Text Translator".to_string(),
            width: 1920.0,
            height: 1080.0,
            font_size: 24.0,
            text_color: [255, 255, 255],
            background_color: [0, 0, 0],
            font_path: None,
            show_status: false,
        }
    }
}

impl DisplayConfig {
    /// Text style derived from the configuration
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            background: self.background_color,
            text_color: self.text_color,
            font_size: self.font_size,
            ..Default::default()
        }
    }
}

/// The translation display window
pub struct TranslationDisplay {
    state: Arc<RwLock<SharedAppState>>,
    style: TextStyle,
    show_status: bool,
    repaint_interval: Duration,
}

impl TranslationDisplay {
    /// Create the display for the shared state
    pub fn new(state: Arc<RwLock<SharedAppState>>) -> Self {
        let (display, repaint_interval) = {
            let s = state.read();
            (s.config.display.clone(), s.config.capture.frame_interval())
        };

        Self {
            state,
            style: display.text_style(),
            show_status: display.show_status,
            repaint_interval,
        }
    }

    fn options(config: &DisplayConfig) -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([config.width, config.height])
                .with_resizable(false)
                .with_title(config.title.clone()),
            ..Default::default()
        }
    }

    fn status_line(&self) -> Option<String> {
        if !self.show_status {
            return None;
        }

        let state = self.state.read();
        let rt = &state.runtime;
        let mut line = format!(
            "captured {} | dropped {} | processed {} | translated {} | {} ms",
            rt.frames_captured,
            rt.frames_dropped,
            rt.frames_processed,
            rt.frames_translated,
            rt.last_processing_ms
        );
        if let Some(err) = &rt.last_error {
            line.push_str(" | ");
            line.push_str(err);
        }
        Some(line)
    }
}

impl eframe::App for TranslationDisplay {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        let text = self.state.read().display.translated_text.clone();
        let status = self.status_line();

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.style.background_color()))
            .show(ctx, |ui| {
                let rect = ui.max_rect();

                if !text.is_empty() {
                    let galley = ui.painter().layout(
                        text,
                        FontId::proportional(self.style.font_size),
                        self.style.text_color32(),
                        self.style.wrap_width(rect.width()),
                    );
                    let pos = rect.center() - galley.size() / 2.0;
                    ui.painter().galley(pos, galley, self.style.text_color32());
                }

                if let Some(status) = status {
                    ui.painter().text(
                        Pos2::new(rect.left() + 8.0, rect.bottom() - 8.0),
                        Align2::LEFT_BOTTOM,
                        status,
                        FontId::monospace(12.0),
                        self.style.status_color(),
                    );
                }
            });

        ctx.request_repaint_after(self.repaint_interval);
    }
}

/// Load a font file and put it first in the proportional family
fn install_font(ctx: &egui::Context, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read font {:?}", path))?;

    let mut fonts = FontDefinitions::default();
    fonts
        .font_data
        .insert("display".to_string(), FontData::from_owned(bytes));
    if let Some(family) = fonts.families.get_mut(&FontFamily::Proportional) {
        family.insert(0, "display".to_string());
    }
    ctx.set_fonts(fonts);

    info!("Loaded display font {:?}", path);
    Ok(())
}

/// Run the display window (blocking until it is closed)
pub fn run_display(state: Arc<RwLock<SharedAppState>>) -> Result<()> {
    let config = state.read().config.display.clone();
    let app = TranslationDisplay::new(state);
    let font_path = config.font_path.clone();

    info!("Opening display window ({}x{})", config.width, config.height);

    eframe::run_native(
        &config.title,
        TranslationDisplay::options(&config),
        Box::new(move |cc| {
            if let Some(path) = &font_path {
                if let Err(e) = install_font(&cc.egui_ctx, path) {
                    tracing::warn!("Using default fonts: {:#}", e);
                }
            }
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow!("Display window failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_display_config_defaults() {
        let config = DisplayConfig::default();
        assert_eq!(config.title, "Game Text Translator");
        assert_eq!((config.width, config.height), (1920.0, 1080.0));
        assert!(config.font_path.is_none());
        assert!(!config.show_status);
    }

    #[test]
    fn test_text_style_from_config() {
        let config = DisplayConfig {
            font_size: 32.0,
            text_color: [255, 255, 0],
            ..Default::default()
        };
        let style = config.text_style();
        assert_eq!(style.font_size, 32.0);
        assert_eq!(style.text_color, [255, 255, 0]);
        assert_eq!(style.background, [0, 0, 0]);
    }

    #[test]
    fn test_status_line() {
        let mut app_config = AppConfig::default();
        app_config.display.show_status = true;
        let state = Arc::new(RwLock::new(SharedAppState::new(app_config)));
        {
            let mut s = state.write();
            s.runtime.frames_captured = 12;
            s.runtime.frames_dropped = 3;
            s.runtime.set_error("Rate limit exceeded");
        }

        let display = TranslationDisplay::new(state);
        let line = display.status_line().unwrap();

        assert!(line.starts_with("captured 12 | dropped 3"));
        assert!(line.ends_with("Rate limit exceeded"));
    }

    #[test]
    fn test_status_line_hidden_by_default() {
        let state = Arc::new(RwLock::new(SharedAppState::default()));
        let display = TranslationDisplay::new(state);
        assert!(display.status_line().is_none());
        assert_eq!(display.repaint_interval.as_millis(), 33);
    }
}
