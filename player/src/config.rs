use anyhow::{Context, Result};
use engine::DesktopGeometry;
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::validate_enum;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub headless: HeadlessSettings,

    #[serde(default)]
    pub wayland: WaylandSettings,

    #[serde(default)]
    pub label: LabelSettings,
}

/// General player settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: default_backend(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_backend() -> String {
    if cfg!(feature = "wayland") {
        "wayland".to_string()
    } else {
        "headless".to_string()
    }
}

/// Headless backend settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HeadlessSettings {
    /// Simulated desktop
    #[serde(flatten)]
    pub geometry: DesktopGeometry,

    /// When set, every presented frame is written here as PNG
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Wayland backend settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WaylandSettings {
    /// Height reserved for server-side decorations
    #[serde(default)]
    pub title_bar_height: u32,
}

/// Stream label and legend text
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// TTF/OTF font file; system fonts are tried when unset
    #[serde(default)]
    pub font: Option<PathBuf>,

    /// Label color (hex format)
    #[serde(default = "default_label_color")]
    pub color: String,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            font: None,
            color: default_label_color(),
        }
    }
}

impl LabelSettings {
    pub fn rgba(&self) -> Option<Rgba<u8>> {
        parse_hex_color(&self.color).map(|(r, g, b, a)| Rgba([r, g, b, a]))
    }
}

fn default_true() -> bool {
    true
}
fn default_label_color() -> String {
    "76B900".to_string()
}

impl Config {
    /// Load configuration from a specific path. A missing file gives the defaults.
    ///
    /// Nothing is logged here: the logger is configured from the result.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("gridplay");

        Ok(config_dir.join("config.toml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        self.validate_log_level(&self.general.log_level)?;
        self.validate_backend(&self.general.backend)?;

        let geometry = &self.headless.geometry;
        if geometry.work_area_width == 0 || geometry.work_area_height == 0 {
            anyhow::bail!(
                "Invalid headless work area: {}x{}",
                geometry.work_area_width,
                geometry.work_area_height
            );
        }

        if self.label.rgba().is_none() {
            anyhow::bail!(
                "Invalid label color: {} (expected hex like 76B900 or #76B900)",
                self.label.color
            );
        }

        Ok(())
    }

    fn validate_log_level(&self, level: &str) -> Result<()> {
        validate_enum!(level, "trace", "debug", "info", "warn", "error")
    }

    fn validate_backend(&self, backend: &str) -> Result<()> {
        validate_enum!(backend, "headless", "wayland")
    }
}

/// Parse a hex color string (e.g., "#FF5733" or "FF5733") to RGBA
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8, u8)> {
    let color = color.trim_start_matches('#');

    if (color.len() != 6 && color.len() != 8) || !color.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&color[0..2], 16).ok()?;
    let g = u8::from_str_radix(&color[2..4], 16).ok()?;
    let b = u8::from_str_radix(&color[4..6], 16).ok()?;
    let a = if color.len() == 8 {
        u8::from_str_radix(&color[6..8], 16).ok()?
    } else {
        255
    };

    Some((r, g, b, a))
}
