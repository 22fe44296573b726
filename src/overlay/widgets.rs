//! Text style for the translation display

use egui::Color32;

/// Style configuration for the translated text
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Background color (RGB)
    pub background: [u8; 3],
    /// Text color (RGB)
    pub text_color: [u8; 3],
    /// Font size in points
    pub font_size: f32,
    /// Horizontal margin kept free on each side when wrapping
    pub margin: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            background: [0, 0, 0],
            text_color: [255, 255, 255],
            font_size: 24.0,
            margin: 40.0,
        }
    }
}

impl TextStyle {
    pub fn background_color(&self) -> Color32 {
        let [r, g, b] = self.background;
        Color32::from_rgb(r, g, b)
    }

    pub fn text_color32(&self) -> Color32 {
        let [r, g, b] = self.text_color;
        Color32::from_rgb(r, g, b)
    }

    /// Status line color, the text color at reduced opacity
    pub fn status_color(&self) -> Color32 {
        let [r, g, b] = self.text_color;
        Color32::from_rgba_unmultiplied(r, g, b, 140)
    }

    /// Width available to the text in a window of the given width
    pub fn wrap_width(&self, available: f32) -> f32 {
        (available - 2.0 * self.margin).max(self.font_size)
    }
}
