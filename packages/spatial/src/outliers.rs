//! Distance-to-centroid IQR outlier filter.

use geo::Coord;

use crate::{MIN_HULL_POINTS, centroid};

/// Groups smaller than this are returned untouched.
pub const MIN_POINTS_FOR_FILTER: usize = 4;

/// Tukey fence multiplier applied to the interquartile range.
pub const IQR_FENCE: f64 = 1.5;

/// Quantile of an ascending-sorted slice, interpolating linearly between
/// the two nearest order statistics.
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty slice.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = q.clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = rank - lo as f64;

    Some((sorted[hi] - sorted[lo]).mul_add(frac, sorted[lo]))
}

/// Removes points whose distance to the group centroid lies above
/// `Q3 + 1.5 * IQR`.
///
/// Distances are Euclidean in raw degree space. Groups with fewer than
/// [`MIN_POINTS_FOR_FILTER`] points are returned as-is, and if filtering
/// would leave fewer than [`MIN_HULL_POINTS`] points the unfiltered group is
/// returned instead, so a group that could form a hull still can.
#[must_use]
pub fn filter_outliers_iqr(points: &[Coord<f64>]) -> Vec<Coord<f64>> {
    if points.len() < MIN_POINTS_FOR_FILTER {
        return points.to_vec();
    }

    let Some(center) = centroid(points) else {
        return points.to_vec();
    };

    let distances: Vec<f64> = points
        .iter()
        .map(|p| (p.x - center.x).hypot(p.y - center.y))
        .collect();

    let mut sorted = distances.clone();
    sorted.sort_by(f64::total_cmp);

    let (Some(q1), Some(q3)) = (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
    else {
        return points.to_vec();
    };
    let upper = IQR_FENCE.mul_add(q3 - q1, q3);

    let kept: Vec<Coord<f64>> = points
        .iter()
        .zip(&distances)
        .filter(|(_, d)| **d <= upper)
        .map(|(p, _)| *p)
        .collect();

    if kept.len() < MIN_HULL_POINTS {
        log::debug!(
            "Outlier filter kept only {} of {} points, using the unfiltered group",
            kept.len(),
            points.len()
        );
        return points.to_vec();
    }

    kept
}
