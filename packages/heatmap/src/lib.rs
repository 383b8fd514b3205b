#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heat aggregation over geocoded customer rows.
//!
//! * [`grid::build_grid`] snaps rows onto a uniform lat/lon grid, sums a
//!   measure per cell and bins the cells into color tiers.
//! * [`density::build_density`] turns rows into weighted points for a
//!   kernel-density layer.
//! * [`bubbles::build_bubbles`] sizes one bubble per customer with sales.
//!
//! Degenerate inputs (no rows, all cells equal) fall back to well-defined
//! outputs. A row that lacks the selected measure is a wiring bug upstream
//! and fails the whole call.

pub mod bubbles;
pub mod density;
pub mod grid;

use sales_map_customer_models::{CustomerId, CustomerRow, MeasureName};
use sales_map_heatmap_models::{MAX_PRECISION, ValueRange};
use thiserror::Error;

pub use bubbles::build_bubbles;
pub use density::build_density;
pub use grid::build_grid;

/// Errors that can occur while aggregating heat layers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeatmapError {
    /// A row does not carry the requested measure.
    #[error("customer {customer_id} has no '{measure}' value")]
    MissingMeasure {
        /// Offending row.
        customer_id: CustomerId,
        /// Requested measure.
        measure: MeasureName,
    },

    /// A measure value is NaN or infinite.
    #[error("customer {customer_id} has a non-finite '{measure}' value ({value})")]
    NonFiniteMeasure {
        /// Offending row.
        customer_id: CustomerId,
        /// Requested measure.
        measure: MeasureName,
        /// The value found.
        value: f64,
    },

    /// Log scaling was requested for a negative value.
    #[error("cannot log-scale negative value {value}")]
    NegativeLogInput {
        /// The negative value.
        value: f64,
    },

    /// The tier count was zero.
    #[error("at least one color tier is required")]
    NoTiers,

    /// The grid precision is finer than supported.
    #[error("grid precision {precision} exceeds the maximum of {max}", max = MAX_PRECISION)]
    PrecisionTooFine {
        /// Requested precision.
        precision: u8,
    },
}

/// Reads `measure` from a row, failing fast if it is absent or not finite.
///
/// # Errors
///
/// Returns [`HeatmapError::MissingMeasure`] or
/// [`HeatmapError::NonFiniteMeasure`].
pub fn measure_value(row: &CustomerRow, measure: MeasureName) -> Result<f64, HeatmapError> {
    let value = row
        .measure(measure)
        .ok_or_else(|| HeatmapError::MissingMeasure {
            customer_id: row.customer_id.clone(),
            measure,
        })?;

    if !value.is_finite() {
        return Err(HeatmapError::NonFiniteMeasure {
            customer_id: row.customer_id.clone(),
            measure,
            value,
        });
    }

    Ok(value)
}

/// `ln(1 + value)`, defined for non-negative values only.
fn log_scale(value: f64) -> Result<f64, HeatmapError> {
    if value < 0.0 {
        return Err(HeatmapError::NegativeLogInput { value });
    }
    Ok(value.ln_1p())
}

/// Min and max of `values`, or `None` if empty.
fn value_range(values: &[f64]) -> Option<ValueRange> {
    let (first, rest) = values.split_first()?;
    Some(rest.iter().fold(
        ValueRange {
            min: *first,
            max: *first,
        },
        |range, &v| ValueRange {
            min: range.min.min(v),
            max: range.max.max(v),
        },
    ))
}
