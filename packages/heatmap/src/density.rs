//! Weighted points for kernel-density heat maps.

use sales_map_customer_models::CustomerRow;
use sales_map_heatmap_models::{
    DensityLayer, DensityNormalization, DensityParams, ValueRange, WeightedPoint,
};
use sales_map_spatial::{map_center, quantile_sorted};

use crate::{HeatmapError, log_scale, measure_value, value_range};

/// Quantile at which [`DensityNormalization::Clipped`] caps weights.
pub const CLIP_QUANTILE: f64 = 0.95;

/// Builds a density layer with one weighted point per validly geocoded row,
/// in input order.
///
/// # Errors
///
/// Returns an error if a row lacks the measure or holds a non-finite value,
/// or if log scaling meets a negative value.
pub fn build_density(
    rows: &[CustomerRow],
    params: &DensityParams,
) -> Result<DensityLayer, HeatmapError> {
    let rows: Vec<&CustomerRow> = rows.iter().filter(|r| r.point.is_valid()).collect();
    let values = rows
        .iter()
        .map(|row| measure_value(row, params.measure))
        .collect::<Result<Vec<_>, _>>()?;

    let center = map_center(rows.iter().map(|r| r.point));

    if values.is_empty() {
        return Ok(DensityLayer {
            points: vec![],
            color_range: None,
            radius: params.radius,
            center,
        });
    }

    let (weights, color_range) = match params.normalization {
        DensityNormalization::Normal => {
            let weights = if params.use_log {
                values
                    .iter()
                    .map(|&v| log_scale(v))
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                values
            };
            let range = value_range(&weights);
            (weights, range)
        }
        DensityNormalization::Percentile => (
            percentile_ranks(&values),
            Some(ValueRange {
                min: 0.0,
                max: 100.0,
            }),
        ),
        DensityNormalization::Clipped => {
            let mut sorted = values.clone();
            sorted.sort_by(f64::total_cmp);
            let cap = quantile_sorted(&sorted, CLIP_QUANTILE).unwrap_or_default();
            (
                values.iter().map(|v| v.min(cap)).collect(),
                Some(ValueRange { min: 0.0, max: cap }),
            )
        }
    };

    log::debug!(
        "Density layer: {} points, {} normalization",
        weights.len(),
        params.normalization
    );

    let points = rows
        .into_iter()
        .zip(weights)
        .map(|(row, weight)| WeightedPoint {
            customer_id: row.customer_id.clone(),
            point: row.point,
            weight,
        })
        .collect();

    Ok(DensityLayer {
        points,
        color_range,
        radius: params.radius,
        center,
    })
}

/// Percentile rank of each value scaled to `0..=100`. Ties share the mean of
/// the ranks they span.
#[allow(clippy::cast_precision_loss)]
fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]].total_cmp(&values[order[start]]).is_eq() {
            end += 1;
        }
        // 1-based ranks start + 1 ..= end
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = mean_rank / n as f64 * 100.0;
        }
        start = end;
    }

    ranks
}
