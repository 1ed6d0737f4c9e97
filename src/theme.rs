//! Drop shop theme object handed to the storefront renderer.

use serde::Serialize;

use crate::domain::aggregates::ThemeMode;
use crate::domain::value_objects::HexColor;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub mode: ThemeMode,
    pub primary: String,
    /// Text color used on top of `primary`.
    pub on_primary: String,
    pub background: String,
    pub surface: String,
    pub text: String,
}

impl Theme {
    pub fn build(primary: &HexColor, mode: ThemeMode) -> Self {
        let on_primary = if primary.luminance() > 0.179 { "#000000" } else { "#ffffff" };
        let (background, surface, text) = match mode {
            ThemeMode::Light => ("#ffffff", "#f5f5f5", "#111111"),
            ThemeMode::Dark => ("#121212", "#1e1e1e", "#f5f5f5"),
        };
        Self {
            mode,
            primary: primary.as_str().to_string(),
            on_primary: on_primary.to_string(),
            background: background.to_string(),
            surface: surface.to_string(),
            text: text.to_string(),
        }
    }
}
