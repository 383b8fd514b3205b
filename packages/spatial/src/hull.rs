//! Convex hulls with an explicit failure outcome.

use geo::{ConvexHull, Coord, MultiPoint, Polygon};
use thiserror::Error;

use crate::MIN_HULL_POINTS;

/// Why no hull could be built for a point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HullError {
    /// Not enough input points.
    #[error("convex hull needs at least {MIN_HULL_POINTS} points, got {count}")]
    TooFewPoints {
        /// Number of points supplied.
        count: usize,
    },

    /// An input coordinate was NaN or infinite.
    #[error("convex hull input contains a non-finite coordinate")]
    NonFinite,

    /// The points are coincident or collinear, so the hull has no area.
    #[error("convex hull is degenerate ({vertices} distinct vertices)")]
    Degenerate {
        /// Distinct vertices found.
        vertices: usize,
    },
}

/// Computes the convex hull of `points`, interpreted as planar coordinates.
///
/// The returned polygon's exterior ring is closed (its last coordinate
/// repeats the first) and wound counter-clockwise.
///
/// # Errors
///
/// Returns a [`HullError`] if fewer than three points are given, a
/// coordinate is not finite, or the points do not span an area.
pub fn convex_hull(points: &[Coord<f64>]) -> Result<Polygon<f64>, HullError> {
    if points.len() < MIN_HULL_POINTS {
        return Err(HullError::TooFewPoints {
            count: points.len(),
        });
    }

    if points.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(HullError::NonFinite);
    }

    let distinct = distinct_count(points);
    if distinct < MIN_HULL_POINTS {
        return Err(HullError::Degenerate { vertices: distinct });
    }

    let hull = MultiPoint::from(points.to_vec()).convex_hull();

    // Collinear input collapses to a two-vertex ring.
    let vertices = hull.exterior().0.len().saturating_sub(1);
    if vertices < MIN_HULL_POINTS {
        return Err(HullError::Degenerate { vertices });
    }

    Ok(hull)
}

fn distinct_count(points: &[Coord<f64>]) -> usize {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use geo::{Area, Intersects, Point};

    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn square_hull_drops_interior_point() {
        let hull = convex_hull(&[
            c(0.0, 0.0),
            c(2.0, 0.0),
            c(2.0, 2.0),
            c(0.0, 2.0),
            c(1.0, 1.0),
        ])
        .unwrap();

        let ring = &hull.exterior().0;
        assert_eq!(ring.len(), 5, "4 vertices plus the closing vertex");
        assert_eq!(ring.first(), ring.last());
        assert!(!ring.contains(&c(1.0, 1.0)));
        assert!((hull.unsigned_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn hull_contains_every_input_point() {
        let points = [
            c(-65.42, -24.78),
            c(-65.37, -24.83),
            c(-65.40, -24.80),
            c(-65.45, -24.86),
            c(-65.39, -24.75),
            c(-65.41, -24.81),
        ];
        let hull = convex_hull(&points).unwrap();
        for p in points {
            assert!(hull.intersects(&Point::from(p)), "{p:?} outside hull");
        }
    }

    #[test]
    fn too_few_points() {
        assert_eq!(
            convex_hull(&[c(0.0, 0.0), c(1.0, 1.0)]),
            Err(HullError::TooFewPoints { count: 2 })
        );
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let result = convex_hull(&[c(0.0, 0.0), c(1.0, 1.0), c(2.0, 2.0), c(3.0, 3.0)]);
        assert!(matches!(result, Err(HullError::Degenerate { .. })));
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let result = convex_hull(&[c(1.0, 1.0), c(1.0, 1.0), c(1.0, 1.0), c(2.0, 2.0)]);
        assert_eq!(result, Err(HullError::Degenerate { vertices: 2 }));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let result = convex_hull(&[c(0.0, 0.0), c(1.0, f64::NAN), c(2.0, 0.0)]);
        assert_eq!(result, Err(HullError::NonFinite));
    }
}
