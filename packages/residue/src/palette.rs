//! Crop display colors.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::ResidueError;

/// Color used for crops missing from the palette.
pub const DEFAULT_CROP_COLOR: &str = "#808080";

const COLORS_TOML: &str = include_str!("../data/crop_colors.toml");

static BUILTIN: LazyLock<CropPalette> = LazyLock::new(|| {
    CropPalette::from_toml_str(COLORS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded crop colors: {e}"))
});

#[derive(Deserialize)]
struct PaletteFile {
    default: Option<String>,
    colors: BTreeMap<String, String>,
}

/// Maps raw crop names to `#RRGGBB` display colors.
#[derive(Debug, Clone)]
pub struct CropPalette {
    default: String,
    colors: BTreeMap<String, String>,
}

impl Default for CropPalette {
    fn default() -> Self {
        Self {
            default: DEFAULT_CROP_COLOR.to_string(),
            colors: BTreeMap::new(),
        }
    }
}

impl CropPalette {
    /// The palette embedded in this crate, matching the cropland layer style.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is invalid (a development error caught by
    /// tests).
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Parses a palette document with an optional `default` color and a
    /// `[colors]` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML fails to parse or any color is not a
    /// `#RRGGBB` string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ResidueError> {
        let file: PaletteFile = toml::de::from_str(toml_str)?;
        let default = file
            .default
            .unwrap_or_else(|| DEFAULT_CROP_COLOR.to_string());

        if !is_hex_color(&default) {
            return Err(ResidueError::InvalidColor {
                crop: "default".to_string(),
                color: default,
            });
        }
        for (crop, color) in &file.colors {
            if !is_hex_color(color) {
                return Err(ResidueError::InvalidColor {
                    crop: crop.clone(),
                    color: color.clone(),
                });
            }
        }

        Ok(Self {
            default,
            colors: file.colors,
        })
    }

    /// Color for a raw crop name, falling back to the default gray.
    #[must_use]
    pub fn color_for(&self, crop: &str) -> &str {
        self.colors.get(crop).map_or(self.default.as_str(), String::as_str)
    }

    /// Number of explicitly colored crops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether no crop has an explicit color.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
