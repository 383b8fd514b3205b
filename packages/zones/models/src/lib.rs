#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Zone polygon types, grouping modes and the zone color palette.
//!
//! A [`Zone`] is a convex-hull polygon drawn around the customers of one
//! delivery route (or one route of one sales rep). Zones are plain data:
//! the renderer resolves colors from [`Rgba`] values or from the
//! [`Zone::palette_index`] into its own palette.

use std::collections::BTreeSet;

pub use sales_map_customer_models::Rgba;
use sales_map_customer_models::{BranchId, CustomerId, GeoPoint, RepId, RouteId};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fill and border color for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneColors {
    /// Polygon fill.
    pub fill: Rgba,
    /// Polygon outline.
    pub border: Rgba,
}

/// Base fill opacity of palette entries.
pub const BASE_FILL_ALPHA: f64 = 0.2;

/// Base border opacity of palette entries.
pub const BASE_BORDER_ALPHA: f64 = 0.8;

const DEFAULT_ZONE_RGB: [(u8, u8, u8); 12] = [
    (255, 0, 0),
    (0, 255, 0),
    (0, 0, 255),
    (255, 255, 0),
    (255, 0, 255),
    (0, 255, 255),
    (255, 128, 0),
    (128, 0, 255),
    (0, 128, 255),
    (255, 0, 128),
    (128, 255, 0),
    (0, 255, 128),
];

/// Ordered, cyclic list of zone colors. Never empty, also when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PaletteEntries")]
pub struct ZonePalette {
    entries: Vec<ZoneColors>,
}

#[derive(Deserialize)]
struct PaletteEntries {
    entries: Vec<ZoneColors>,
}

impl TryFrom<PaletteEntries> for ZonePalette {
    type Error = EmptyPaletteError;

    fn try_from(value: PaletteEntries) -> Result<Self, Self::Error> {
        Self::new(value.entries).ok_or(EmptyPaletteError)
    }
}

/// Error returned when a palette is built from an empty color list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyPaletteError;

impl std::fmt::Display for EmptyPaletteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a zone palette needs at least one color")
    }
}

impl std::error::Error for EmptyPaletteError {}

impl ZonePalette {
    /// Creates a palette from explicit entries.
    ///
    /// Returns `None` if `entries` is empty.
    #[must_use]
    pub fn new(entries: Vec<ZoneColors>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }

    /// Number of distinct entries before the palette repeats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; a palette has at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Colors for the given running index, wrapping around.
    #[must_use]
    pub fn get(&self, index: usize) -> ZoneColors {
        self.entries[index % self.entries.len()]
    }
}

impl Default for ZonePalette {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ZONE_RGB
                .iter()
                .map(|&(r, g, b)| ZoneColors {
                    fill: Rgba::new(r, g, b, BASE_FILL_ALPHA),
                    border: Rgba::new(r, g, b, BASE_BORDER_ALPHA),
                })
                .collect(),
        }
    }
}

/// Explicit color state for one zone-building call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStyle {
    /// Palette to draw colors from.
    pub palette: ZonePalette,
    /// Palette index assigned to the first color owner.
    pub color_offset: usize,
}

/// How customers are partitioned into zones.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum ZoneGrouping {
    /// One zone per `(branch, route)`.
    #[strum(to_string = "route", serialize = "ruta")]
    #[serde(alias = "ruta")]
    Route,
    /// One zone per route of each `(rep, branch)`, colored per rep.
    #[strum(to_string = "rep", serialize = "preventista")]
    #[serde(alias = "preventista")]
    Rep,
}

/// A named coverage area drawn as the convex hull of its customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Display name, e.g. `"R1 (B1)"` or `"Ana (B1) - R1"`.
    pub name: String,
    /// Route the zone covers.
    pub route: RouteId,
    /// Branch of the route, when known.
    pub branch: Option<BranchId>,
    /// Sales rep, for rep grouping.
    pub rep: Option<RepId>,
    /// Closed hull ring: the first point is repeated at the end.
    pub points: Vec<GeoPoint>,
    /// Every customer of the group, outliers included.
    pub member_customer_ids: BTreeSet<CustomerId>,
    /// Group size before outlier filtering.
    pub member_count_total: usize,
    /// Points that shaped the hull.
    pub member_count_after_outlier_filter: usize,
    /// Fill color.
    pub fill_color: Rgba,
    /// Outline color.
    pub border_color: Rgba,
    /// Running palette index this zone's colors came from.
    pub palette_index: usize,
}
