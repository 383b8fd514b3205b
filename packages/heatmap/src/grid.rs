//! Uniform lat/lon heat grid with color tiers.

use std::collections::BTreeMap;

use sales_map_customer_models::{CustomerRow, GeoPoint};
use sales_map_heatmap_models::{
    CellKey, ColorTier, GridCell, GridParams, LatLon, MAX_PRECISION, heat_tier_color,
};

use crate::{HeatmapError, log_scale, measure_value};

/// Keeps a normalized value of exactly `1.0` inside the last tier.
const TIER_EPSILON: f64 = 0.001;

/// Normalized value given to every cell when all cells are equal.
const FLAT_NORMALIZED_VALUE: f64 = 0.5;

/// Aggregates `rows` into color tiers keyed by tier index.
///
/// Each row is snapped to the grid cell at `params.precision`, the measure
/// is summed per cell, optionally log-scaled, min-max normalized and binned
/// into `params.tiers` bands. Tiers without cells are absent from the map.
/// Tier totals always use the raw sums. Rows with an invalid geocode are
/// skipped.
///
/// # Errors
///
/// Returns an error if `params.tiers` is zero, the precision is finer than
/// [`MAX_PRECISION`], a row lacks the measure, or a negative cell sum would
/// have to be log-scaled.
pub fn build_grid(
    rows: &[CustomerRow],
    params: &GridParams,
) -> Result<BTreeMap<usize, ColorTier>, HeatmapError> {
    if params.tiers == 0 {
        return Err(HeatmapError::NoTiers);
    }
    if params.precision > MAX_PRECISION {
        return Err(HeatmapError::PrecisionTooFine {
            precision: params.precision,
        });
    }

    let factor = 10_f64.powi(i32::from(params.precision));

    let mut sums: BTreeMap<CellKey, (f64, usize)> = BTreeMap::new();
    let mut skipped = 0_usize;

    for row in rows {
        if !row.point.is_valid() {
            skipped += 1;
            continue;
        }
        let value = measure_value(row, params.measure)?;
        let entry = sums.entry(cell_key(row.point, factor)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} rows without a valid geocode");
    }

    let mut cells = Vec::with_capacity(sums.len());
    for (key, (sum, count)) in sums {
        let color_value = if params.use_log { log_scale(sum)? } else { sum };
        cells.push(GridCell {
            key,
            center: cell_center(key, factor),
            aggregated_value: sum,
            color_value,
            normalized_value: 0.0,
            member_count: count,
        });
    }

    normalize(&mut cells);

    let half = 0.5 / factor;
    let mut tiers: BTreeMap<usize, ColorTier> = BTreeMap::new();

    for cell in cells {
        let tier_index = assign_tier(cell.normalized_value, params.tiers);
        let tier = tiers.entry(tier_index).or_insert_with(|| ColorTier {
            tier_index,
            color: heat_tier_color(tier_index, params.tiers),
            cells: Vec::new(),
            polygon_coordinates: Vec::new(),
            total_value: 0.0,
            total_members: 0,
        });

        if !tier.polygon_coordinates.is_empty() {
            tier.polygon_coordinates.push(None);
        }
        tier.polygon_coordinates
            .extend(square_ring(cell.center, half).into_iter().map(Some));
        tier.total_value += cell.aggregated_value;
        tier.total_members += cell.member_count;
        tier.cells.push(cell);
    }

    log::debug!(
        "Grid at precision {} ({} measure): {} rows into {} tiers",
        params.precision,
        params.measure,
        rows.len() - skipped,
        tiers.len()
    );

    Ok(tiers)
}

/// Grid address of a point. Ties round to even, so the mapping is a pure
/// function of `(point, precision)`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cell_key(point: GeoPoint, factor: f64) -> CellKey {
    CellKey {
        lat_bucket: (point.latitude * factor).round_ties_even() as i64,
        lon_bucket: (point.longitude * factor).round_ties_even() as i64,
    }
}

#[allow(clippy::cast_precision_loss)]
fn cell_center(key: CellKey, factor: f64) -> GeoPoint {
    GeoPoint::new(
        key.lon_bucket as f64 / factor,
        key.lat_bucket as f64 / factor,
    )
}

/// Min-max normalizes `color_value` into `normalized_value`.
fn normalize(cells: &mut [GridCell]) {
    let Some(first) = cells.first() else {
        return;
    };

    let (min, max) = cells
        .iter()
        .fold((first.color_value, first.color_value), |(lo, hi), c| {
            (lo.min(c.color_value), hi.max(c.color_value))
        });

    for cell in cells {
        cell.normalized_value = if max > min {
            (cell.color_value - min) / (max - min)
        } else {
            FLAT_NORMALIZED_VALUE
        };
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn assign_tier(normalized: f64, tiers: usize) -> usize {
    let scaled = (normalized.clamp(0.0, 1.0) * (tiers as f64 - TIER_EPSILON)).floor();
    (scaled as usize).min(tiers - 1)
}

/// Closed square ring around `center`, as `(lat, lon)` vertices.
fn square_ring(center: GeoPoint, half: f64) -> [LatLon; 5] {
    let (lat, lon) = (center.latitude, center.longitude);
    [
        LatLon {
            lat: lat - half,
            lon: lon - half,
        },
        LatLon {
            lat: lat - half,
            lon: lon + half,
        },
        LatLon {
            lat: lat + half,
            lon: lon + half,
        },
        LatLon {
            lat: lat + half,
            lon: lon - half,
        },
        LatLon {
            lat: lat - half,
            lon: lon - half,
        },
    ]
}
