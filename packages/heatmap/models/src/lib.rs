#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heat map output types: grid cells, color tiers, and the density and
//! bubble layers.
//!
//! All types are plain serializable data with no dependency on a charting
//! library. Polygon batches use `None` as a break between rings, which is
//! how most map renderers draw many polygons as one trace.

use sales_map_customer_models::{CustomerId, GeoPoint, MeasureName, Rgba};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default number of color tiers.
pub const DEFAULT_TIERS: usize = 8;

/// Default grid precision: cells of `0.01` degrees (roughly 1 km).
pub const DEFAULT_PRECISION: u8 = 2;

/// Finest supported grid precision.
pub const MAX_PRECISION: u8 = 8;

/// Default kernel radius (pixels) for density layers.
pub const DEFAULT_DENSITY_RADIUS: u32 = 50;

/// Cold-to-hot fill colors for the default eight tiers.
pub const HEAT_TIER_COLORS: [Rgba; DEFAULT_TIERS] = [
    Rgba::new(0, 50, 150, 0.6),
    Rgba::new(0, 100, 255, 0.6),
    Rgba::new(0, 200, 255, 0.6),
    Rgba::new(0, 255, 150, 0.6),
    Rgba::new(200, 255, 0, 0.6),
    Rgba::new(255, 200, 0, 0.6),
    Rgba::new(255, 100, 0, 0.6),
    Rgba::new(200, 0, 0, 0.7),
];

/// Fill color for `tier` out of `tiers`, sampling [`HEAT_TIER_COLORS`]
/// proportionally when `tiers` is not eight.
#[must_use]
pub fn heat_tier_color(tier: usize, tiers: usize) -> Rgba {
    let last = HEAT_TIER_COLORS.len() - 1;
    if tiers <= 1 {
        return HEAT_TIER_COLORS[0];
    }
    let span = (tiers - 1) as u128;
    let tier = (tier as u128).min(span);
    // u128 keeps `tier * last` exact for any usize tier count
    let index = (tier * last as u128 + span / 2) / span;
    HEAT_TIER_COLORS[usize::try_from(index).map_or(last, |i| i.min(last))]
}

/// Inclusive value range used for legends and colorbars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lowest value.
    pub min: f64,
    /// Highest value.
    pub max: f64,
}

/// A `(latitude, longitude)` vertex of a tier polygon batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Integer grid address of a cell: coordinates multiplied by
/// `10^precision` and rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    /// Latitude bucket.
    pub lat_bucket: i64,
    /// Longitude bucket.
    pub lon_bucket: i64,
}

/// One occupied grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// Grid address.
    pub key: CellKey,
    /// Center of the cell in degrees.
    pub center: GeoPoint,
    /// Raw sum of the measure over the cell's rows.
    pub aggregated_value: f64,
    /// Value used for coloring (`ln(1 + x)` of the sum when log scaling).
    pub color_value: f64,
    /// Color value min-max normalized across all cells, in `[0, 1]`.
    pub normalized_value: f64,
    /// Number of rows in the cell.
    pub member_count: usize,
}

/// All cells sharing one color band, merged into a single polygon batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorTier {
    /// Band index, `0` is coldest.
    pub tier_index: usize,
    /// Fill color of the band.
    pub color: Rgba,
    /// Member cells in key order.
    pub cells: Vec<GridCell>,
    /// One closed square ring per cell, rings separated by `None`.
    pub polygon_coordinates: Vec<Option<LatLon>>,
    /// Sum of the raw (never log-scaled) cell values.
    pub total_value: f64,
    /// Sum of the cells' row counts.
    pub total_members: usize,
}

impl ColorTier {
    /// Number of cells in this tier.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Parameters of a heat grid aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridParams {
    /// Measure to aggregate.
    pub measure: MeasureName,
    /// Decimal digits kept when snapping coordinates; cell size is
    /// `10^-precision` degrees.
    pub precision: u8,
    /// Color by `ln(1 + sum)` instead of the raw sum.
    pub use_log: bool,
    /// Number of color tiers.
    pub tiers: usize,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            measure: MeasureName::Units,
            precision: DEFAULT_PRECISION,
            use_log: false,
            tiers: DEFAULT_TIERS,
        }
    }
}

/// How density weights are derived from the measure.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum DensityNormalization {
    /// Raw measure values, optionally log-scaled.
    #[default]
    #[strum(to_string = "normal")]
    Normal,
    /// Percentile rank of each value, `0` to `100`.
    #[strum(to_string = "percentile", serialize = "percentil")]
    #[serde(alias = "percentil")]
    Percentile,
    /// Values capped at the 95th percentile.
    #[strum(to_string = "clipped", serialize = "limitado")]
    #[serde(alias = "limitado")]
    Clipped,
}

/// Parameters of a density layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityParams {
    /// Measure used as weight.
    pub measure: MeasureName,
    /// Weight normalization.
    pub normalization: DensityNormalization,
    /// Log-scale weights; only applies to [`DensityNormalization::Normal`].
    pub use_log: bool,
    /// Kernel radius handed to the renderer.
    pub radius: u32,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            measure: MeasureName::Units,
            normalization: DensityNormalization::Normal,
            use_log: false,
            radius: DEFAULT_DENSITY_RADIUS,
        }
    }
}

/// A customer location with its density weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedPoint {
    /// Customer the point belongs to.
    pub customer_id: CustomerId,
    /// Location.
    pub point: GeoPoint,
    /// Normalized weight.
    pub weight: f64,
}

/// Weighted points for a kernel-density heat map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityLayer {
    /// Weighted points in input order.
    pub points: Vec<WeightedPoint>,
    /// Colorbar range for the weights, `None` when there are no points.
    pub color_range: Option<ValueRange>,
    /// Kernel radius.
    pub radius: u32,
    /// Where to center the map.
    pub center: GeoPoint,
}

/// A customer bubble sized by its measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bubble {
    /// Customer the bubble belongs to.
    pub customer_id: CustomerId,
    /// Location.
    pub point: GeoPoint,
    /// Measure value (also the bubble color value).
    pub value: f64,
    /// Marker size in pixels.
    pub size: f64,
}

/// A customer without sales, drawn as a plain marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleCustomer {
    /// Customer id.
    pub customer_id: CustomerId,
    /// Location.
    pub point: GeoPoint,
}

/// Bubble map layer split by whether the customer bought anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BubbleLayer {
    /// Customers with positive unit volume.
    pub with_sales: Vec<Bubble>,
    /// Customers without sales.
    pub without_sales: Vec<IdleCustomer>,
    /// Colorbar range over `with_sales`, `None` when it is empty.
    pub value_range: Option<ValueRange>,
    /// Where to center the map.
    pub center: GeoPoint,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn eight_tiers_map_one_to_one() {
        for (tier, color) in HEAT_TIER_COLORS.iter().enumerate() {
            assert_eq!(heat_tier_color(tier, DEFAULT_TIERS), *color);
        }
    }

    #[test]
    fn other_tier_counts_span_the_palette() {
        assert_eq!(heat_tier_color(0, 4), HEAT_TIER_COLORS[0]);
        assert_eq!(heat_tier_color(3, 4), HEAT_TIER_COLORS[7]);
        assert_eq!(heat_tier_color(0, 1), HEAT_TIER_COLORS[0]);
        assert_eq!(heat_tier_color(15, 16), HEAT_TIER_COLORS[7]);
        assert_eq!(heat_tier_color(99, 16), HEAT_TIER_COLORS[7]);
    }

    #[test]
    fn huge_tier_counts_do_not_overflow() {
        assert_eq!(heat_tier_color(0, usize::MAX), HEAT_TIER_COLORS[0]);
        assert_eq!(
            heat_tier_color(usize::MAX - 1, usize::MAX),
            HEAT_TIER_COLORS[7]
        );
        assert_eq!(heat_tier_color(usize::MAX, usize::MAX), HEAT_TIER_COLORS[7]);
        let middle = heat_tier_color(usize::MAX / 2, usize::MAX);
        assert!(middle == HEAT_TIER_COLORS[3] || middle == HEAT_TIER_COLORS[4]);
    }

    #[test]
    fn normalization_names() {
        assert_eq!(
            DensityNormalization::from_str("percentil"),
            Ok(DensityNormalization::Percentile)
        );
        assert_eq!(
            DensityNormalization::from_str("limitado"),
            Ok(DensityNormalization::Clipped)
        );
        assert_eq!(DensityNormalization::Clipped.to_string(), "clipped");
        assert_eq!(DensityNormalization::default(), DensityNormalization::Normal);
    }
}
