//! TOML map configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the dashboard's stock settings. Command-line flags override whatever is
//! loaded here.

use std::path::Path;

use sales_map_customer_models::MeasureName;
use sales_map_heatmap_models::{
    DEFAULT_DENSITY_RADIUS, DEFAULT_PRECISION, DEFAULT_TIERS, DensityNormalization, DensityParams,
    GridParams, MAX_PRECISION,
};
use sales_map_zones_models::{
    BASE_BORDER_ALPHA, BASE_FILL_ALPHA, Rgba, ZoneColors, ZoneGrouping, ZonePalette, ZoneStyle,
};
use serde::Deserialize;

/// Errors from loading a map configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path to the config file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// `zones.palette` was present but empty.
    #[error("zones.palette must list at least one color")]
    EmptyPalette,

    /// `grid.tiers` was zero.
    #[error("grid.tiers must be at least 1")]
    NoTiers,

    /// `grid.precision` is finer than supported.
    #[error("grid.precision {0} exceeds the maximum of {max}", max = MAX_PRECISION)]
    PrecisionTooFine(u8),
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MapConfig {
    /// Measure used when a command does not name one.
    pub measure: MeasureName,
    /// Zone settings.
    pub zones: ZonesConfig,
    /// Heat grid settings.
    pub grid: GridConfig,
    /// Density layer settings.
    pub density: DensityConfig,
}

/// `[zones]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ZonesConfig {
    /// Route or rep grouping.
    pub grouping: ZoneGrouping,
    /// Palette position of the first zone.
    pub color_offset: usize,
    /// Custom `[r, g, b]` palette; the built-in twelve colors when absent.
    pub palette: Option<Vec<[u8; 3]>>,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            grouping: ZoneGrouping::Route,
            color_offset: 0,
            palette: None,
        }
    }
}

impl ZonesConfig {
    /// Resolves the palette and offset into a [`ZoneStyle`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPalette`] for an empty custom palette.
    pub fn style(&self) -> Result<ZoneStyle, ConfigError> {
        let palette = match &self.palette {
            None => ZonePalette::default(),
            Some(colors) => ZonePalette::new(
                colors
                    .iter()
                    .map(|&[r, g, b]| ZoneColors {
                        fill: Rgba::new(r, g, b, BASE_FILL_ALPHA),
                        border: Rgba::new(r, g, b, BASE_BORDER_ALPHA),
                    })
                    .collect(),
            )
            .ok_or(ConfigError::EmptyPalette)?,
        };

        Ok(ZoneStyle {
            palette,
            color_offset: self.color_offset,
        })
    }
}

/// `[grid]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GridConfig {
    /// Decimal digits kept when snapping coordinates.
    pub precision: u8,
    /// Color by `ln(1 + sum)`.
    pub use_log: bool,
    /// Number of color tiers.
    pub tiers: usize,
    /// Include customers without sales.
    pub include_idle: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            use_log: false,
            tiers: DEFAULT_TIERS,
            include_idle: false,
        }
    }
}

/// `[density]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DensityConfig {
    /// Weight normalization.
    pub normalization: DensityNormalization,
    /// Log-scale weights (normal mode only).
    pub use_log: bool,
    /// Kernel radius in pixels.
    pub radius: u32,
    /// Include customers without sales.
    pub include_idle: bool,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            normalization: DensityNormalization::Normal,
            use_log: false,
            radius: DEFAULT_DENSITY_RADIUS,
            include_idle: false,
        }
    }
}

impl MapConfig {
    /// Grid parameters for `measure`.
    #[must_use]
    pub const fn grid_params(&self, measure: MeasureName) -> GridParams {
        GridParams {
            measure,
            precision: self.grid.precision,
            use_log: self.grid.use_log,
            tiers: self.grid.tiers,
        }
    }

    /// Density parameters for `measure`.
    #[must_use]
    pub const fn density_params(&self, measure: MeasureName) -> DensityParams {
        DensityParams {
            measure,
            normalization: self.density.normalization,
            use_log: self.density.use_log,
            radius: self.density.radius,
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.grid.tiers == 0 {
            return Err(ConfigError::NoTiers);
        }
        if self.grid.precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionTooFine(self.grid.precision));
        }
        self.zones.style()?;
        Ok(self)
    }
}

/// Parses a configuration from TOML text.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or a value is out of range.
pub fn parse_config(toml_str: &str) -> Result<MapConfig, ConfigError> {
    toml::de::from_str::<MapConfig>(toml_str)?.validate()
}

/// Loads the configuration at `path`, or the defaults when `path` is `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<MapConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(MapConfig::default());
    };

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    log::debug!("Loaded config from {}", path.display());

    parse_config(&text)
}
