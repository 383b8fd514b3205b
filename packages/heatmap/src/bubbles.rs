//! Per-customer bubble map layer.

use sales_map_customer_models::{CustomerRow, MeasureName};
use sales_map_heatmap_models::{Bubble, BubbleLayer, IdleCustomer};
use sales_map_spatial::map_center;

use crate::{HeatmapError, measure_value, value_range};

/// Size of the smallest bubble, in pixels.
pub const BUBBLE_MIN_SIZE: f64 = 10.0;

/// Size added on top of [`BUBBLE_MIN_SIZE`] for the largest value.
pub const BUBBLE_SIZE_SPAN: f64 = 30.0;

/// Size used for every bubble when no value is positive.
pub const BUBBLE_FLAT_SIZE: f64 = 15.0;

/// Splits validly geocoded rows into sized bubbles (customers with units
/// sold) and plain markers (everyone else).
///
/// Only rows with sales need to carry `measure`.
///
/// # Errors
///
/// Returns an error if a row with sales lacks the measure or holds a
/// non-finite value.
pub fn build_bubbles(
    rows: &[CustomerRow],
    measure: MeasureName,
) -> Result<BubbleLayer, HeatmapError> {
    let rows: Vec<&CustomerRow> = rows.iter().filter(|r| r.point.is_valid()).collect();
    let center = map_center(rows.iter().map(|r| r.point));

    let mut with_sales = Vec::new();
    let mut without_sales = Vec::new();

    for row in rows {
        if row.has_sales() {
            with_sales.push(Bubble {
                customer_id: row.customer_id.clone(),
                point: row.point,
                value: measure_value(row, measure)?,
                size: 0.0,
            });
        } else {
            without_sales.push(IdleCustomer {
                customer_id: row.customer_id.clone(),
                point: row.point,
            });
        }
    }

    let values: Vec<f64> = with_sales.iter().map(|b| b.value).collect();
    let value_range = value_range(&values);
    let max = value_range.map_or(0.0, |r| r.max);

    for bubble in &mut with_sales {
        bubble.size = if max > 0.0 {
            (bubble.value / max).mul_add(BUBBLE_SIZE_SPAN, BUBBLE_MIN_SIZE)
        } else {
            BUBBLE_FLAT_SIZE
        };
    }

    log::debug!(
        "Bubble layer: {} with sales, {} without",
        with_sales.len(),
        without_sales.len()
    );

    Ok(BubbleLayer {
        with_sales,
        without_sales,
        value_range,
        center,
    })
}

#[cfg(test)]
mod tests {
    use sales_map_customer_models::{DEFAULT_MAP_CENTER, GeoPoint};

    use super::*;

    fn customer(id: &str, units: f64, revenue: Option<f64>) -> CustomerRow {
        let row = CustomerRow::new(id, GeoPoint::new(-65.4, -24.8))
            .with_measure(MeasureName::Units, units);
        match revenue {
            Some(value) => row.with_measure(MeasureName::Revenue, value),
            None => row,
        }
    }

    #[test]
    fn sizes_scale_with_the_largest_value() {
        let rows = vec![
            customer("a", 1.0, Some(50.0)),
            customer("b", 3.0, Some(100.0)),
            customer("idle", 0.0, None),
        ];
        let layer = build_bubbles(&rows, MeasureName::Revenue).unwrap();

        let sizes: Vec<f64> = layer.with_sales.iter().map(|b| b.size).collect();
        assert_eq!(sizes, vec![25.0, 40.0]);
        assert_eq!(layer.without_sales.len(), 1);
        assert_eq!(layer.without_sales[0].customer_id.as_str(), "idle");
        assert_eq!(layer.value_range.map(|r| (r.min, r.max)), Some((50.0, 100.0)));
    }

    #[test]
    fn non_positive_max_uses_flat_size() {
        let rows = vec![customer("a", 2.0, Some(0.0)), customer("b", 1.0, Some(-4.0))];
        let layer = build_bubbles(&rows, MeasureName::Revenue).unwrap();
        assert!(layer.with_sales.iter().all(|b| (b.size - 15.0).abs() < f64::EPSILON));
    }

    #[test]
    fn no_sales_means_no_range() {
        let rows = vec![customer("a", 0.0, None), customer("b", -1.0, None)];
        let layer = build_bubbles(&rows, MeasureName::Revenue).unwrap();
        assert!(layer.with_sales.is_empty());
        assert_eq!(layer.without_sales.len(), 2);
        assert_eq!(layer.value_range, None);
    }

    #[test]
    fn empty_input_centers_on_default() {
        let layer = build_bubbles(&[], MeasureName::Units).unwrap();
        assert_eq!(layer.center, DEFAULT_MAP_CENTER);
    }

    #[test]
    fn seller_without_measure_fails() {
        let rows = vec![customer("a", 2.0, None)];
        assert!(matches!(
            build_bubbles(&rows, MeasureName::Revenue),
            Err(HeatmapError::MissingMeasure { .. })
        ));
    }
}
