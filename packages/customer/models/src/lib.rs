#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geocoded customer rows and the categorical keys and sales measures
//! attached to them.
//!
//! A [`CustomerRow`] is the unit both the zone builder and the heat grid
//! consume. Categorical keys are explicit newtypes so that a route is never
//! confused with a branch, and composite keys are tuples of these rather
//! than delimited strings. The [`Rgba`] color shared by the zone and heat
//! layers lives here too.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Center used when there is no valid point to average (Salta, AR).
pub const DEFAULT_MAP_CENTER: GeoPoint = GeoPoint {
    longitude: -65.4,
    latitude: -24.8,
};

/// Placeholder values the warehouse writes in place of `NULL` categorical
/// fields. Treated exactly like an empty value.
pub const UNASSIGNED_SENTINELS: &[&str] = &["Sin ruta", "Sin preventista", "Sin sucursal"];

/// An sRGB color with alpha, rendered as CSS `rgba(r, g, b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Opacity in `[0, 1]`.
    pub a: f64,
}

impl Rgba {
    /// Creates a color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the same color with a different opacity.
    #[must_use]
    pub const fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Two decimals hides accumulated float noise such as 0.30000000000000004.
        let alpha = (self.a * 100.0).round() / 100.0;
        write!(f, "rgba({}, {}, {}, {alpha})", self.r, self.g, self.b)
    }
}

/// A longitude/latitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Longitude in degrees (x).
    pub longitude: f64,
    /// Latitude in degrees (y).
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point from longitude and latitude.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether this point is a usable geocode.
    ///
    /// Both coordinates must be finite, and `(0, 0)` is the warehouse's
    /// "never geocoded" marker.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && !(self.longitude == 0.0 && self.latitude == 0.0)
    }
}

/// Returns `true` if a raw categorical value carries no assignment.
#[must_use]
pub fn is_unassigned(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || UNASSIGNED_SENTINELS
            .iter()
            .any(|s| s.eq_ignore_ascii_case(trimmed))
}

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw value without normalization.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Normalizes a raw warehouse value, returning `None` for empty
            /// strings and the unassigned sentinels.
            #[must_use]
            pub fn parse(raw: &str) -> Option<Self> {
                if is_unassigned(raw) {
                    None
                } else {
                    Some(Self(raw.trim().to_string()))
                }
            }

            /// Whether this key names a real assignment.
            #[must_use]
            pub fn is_assigned(&self) -> bool {
                !is_unassigned(&self.0)
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_key!(
    /// Opaque customer identifier.
    CustomerId
);

string_key!(
    /// Branch (sucursal) identifier.
    BranchId
);

string_key!(
    /// Delivery route identifier.
    ///
    /// Route numbers repeat across branches, so a route is only unique
    /// together with its [`BranchId`]. The value is displayed, never parsed.
    RouteId
);

string_key!(
    /// Sales rep (preventista) identifier.
    RepId
);

/// Numeric sales measures a map can be colored or sized by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum MeasureName {
    /// Unit volume (bultos).
    #[default]
    #[strum(to_string = "units", serialize = "cantidad_total")]
    #[serde(alias = "cantidad_total")]
    Units,
    /// Invoiced revenue.
    #[strum(to_string = "revenue", serialize = "facturacion")]
    #[serde(alias = "facturacion")]
    Revenue,
    /// Number of sales documents.
    #[strum(to_string = "documents", serialize = "cantidad_documentos")]
    #[serde(alias = "cantidad_documentos")]
    Documents,
}

impl MeasureName {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Units, Self::Revenue, Self::Documents]
    }

    /// Human-readable label for legends and colorbars.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Units => "Cantidad (bultos)",
            Self::Revenue => "Facturación ($)",
            Self::Documents => "Documentos",
        }
    }

    /// Parses a measure name, accepting both the short names and the
    /// warehouse column names.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not one of the known measures.
    pub fn parse(name: &str) -> Result<Self, UnknownMeasureError> {
        Self::from_str(name.trim()).map_err(|_| UnknownMeasureError {
            name: name.to_string(),
        })
    }
}

/// Error returned when a caller asks for a measure that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMeasureError {
    /// The name that was requested.
    pub name: String,
}

impl std::fmt::Display for UnknownMeasureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown measure '{}': expected units, revenue or documents",
            self.name
        )
    }
}

impl std::error::Error for UnknownMeasureError {}

/// One customer (optionally for one time period) with its geocode,
/// categorical assignments and measure values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRow {
    /// Customer identifier.
    pub customer_id: CustomerId,
    /// Geocoded location.
    pub point: GeoPoint,
    /// Delivery route, if assigned.
    pub route: Option<RouteId>,
    /// Sales rep, if assigned.
    pub rep: Option<RepId>,
    /// Branch, if known.
    pub branch: Option<BranchId>,
    /// Measure values present for this row.
    pub measures: BTreeMap<MeasureName, f64>,
}

impl CustomerRow {
    /// Creates a row with no categorical assignments and no measures.
    #[must_use]
    pub fn new(customer_id: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            customer_id: CustomerId::new(customer_id),
            point,
            route: None,
            rep: None,
            branch: None,
            measures: BTreeMap::new(),
        }
    }

    /// Sets the route, normalizing sentinels to `None`.
    #[must_use]
    pub fn with_route(mut self, route: &str) -> Self {
        self.route = RouteId::parse(route);
        self
    }

    /// Sets the sales rep, normalizing sentinels to `None`.
    #[must_use]
    pub fn with_rep(mut self, rep: &str) -> Self {
        self.rep = RepId::parse(rep);
        self
    }

    /// Sets the branch, normalizing sentinels to `None`.
    #[must_use]
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = BranchId::parse(branch);
        self
    }

    /// Sets a measure value.
    #[must_use]
    pub fn with_measure(mut self, measure: MeasureName, value: f64) -> Self {
        self.measures.insert(measure, value);
        self
    }

    /// Returns the value of `measure`, if present on this row.
    #[must_use]
    pub fn measure(&self, measure: MeasureName) -> Option<f64> {
        self.measures.get(&measure).copied()
    }

    /// Whether this customer bought anything (positive unit volume).
    #[must_use]
    pub fn has_sales(&self) -> bool {
        self.measure(MeasureName::Units).is_some_and(|v| v > 0.0)
    }

    /// The assigned route, ignoring empty or sentinel values.
    #[must_use]
    pub fn assigned_route(&self) -> Option<&RouteId> {
        self.route.as_ref().filter(|r| r.is_assigned())
    }

    /// The assigned sales rep, ignoring empty or sentinel values.
    #[must_use]
    pub fn assigned_rep(&self) -> Option<&RepId> {
        self.rep.as_ref().filter(|r| r.is_assigned())
    }

    /// The known branch, ignoring empty or sentinel values.
    #[must_use]
    pub fn known_branch(&self) -> Option<&BranchId> {
        self.branch.as_ref().filter(|b| b.is_assigned())
    }
}
