#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shared geometry for sales maps.
//!
//! Everything here works on planar `(longitude, latitude)` coordinates in
//! raw degrees. Zones are small enough that degree-space distances rank
//! dispersion well, and the outlier filter depends on exactly that metric,
//! so nothing in this crate projects or uses geodesic distances.

pub mod hull;
pub mod index;
pub mod outliers;

use geo::Coord;
use sales_map_customer_models::{DEFAULT_MAP_CENTER, GeoPoint};

pub use hull::{HullError, convex_hull};
pub use index::PolygonIndex;
pub use outliers::{filter_outliers_iqr, quantile_sorted};

/// Minimum number of distinct points a convex hull needs.
pub const MIN_HULL_POINTS: usize = 3;

/// Converts a [`GeoPoint`] into a planar coordinate (`x` = longitude).
#[must_use]
pub const fn to_coord(point: GeoPoint) -> Coord<f64> {
    Coord {
        x: point.longitude,
        y: point.latitude,
    }
}

/// Converts a planar coordinate back into a [`GeoPoint`].
#[must_use]
pub const fn to_geo_point(coord: Coord<f64>) -> GeoPoint {
    GeoPoint::new(coord.x, coord.y)
}

/// Arithmetic mean of a set of coordinates.
///
/// Returns `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[Coord<f64>]) -> Option<Coord<f64>> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(x, y), c| (x + c.x, y + c.y));

    Some(Coord {
        x: sum_x / n,
        y: sum_y / n,
    })
}

/// Center to open a map on: the mean of all valid points, or
/// [`DEFAULT_MAP_CENTER`] when there are none.
#[must_use]
pub fn map_center(points: impl IntoIterator<Item = GeoPoint>) -> GeoPoint {
    let coords: Vec<Coord<f64>> = points
        .into_iter()
        .filter(GeoPoint::is_valid)
        .map(to_coord)
        .collect();

    centroid(&coords).map_or(DEFAULT_MAP_CENTER, to_geo_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_empty_is_none() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn centroid_is_mean() {
        let c = centroid(&[
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 2.0, y: 0.0 },
            Coord { x: 2.0, y: 4.0 },
            Coord { x: 0.0, y: 4.0 },
        ])
        .unwrap();
        assert!((c.x - 1.0).abs() < 1e-12);
        assert!((c.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn map_center_skips_invalid_points() {
        let center = map_center([
            GeoPoint::new(-65.0, -24.0),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-66.0, -25.0),
            GeoPoint::new(f64::NAN, -30.0),
        ]);
        assert!((center.longitude - -65.5).abs() < 1e-12);
        assert!((center.latitude - -24.5).abs() < 1e-12);
    }

    #[test]
    fn map_center_falls_back_when_empty() {
        assert_eq!(map_center([GeoPoint::new(0.0, 0.0)]), DEFAULT_MAP_CENTER);
        assert_eq!(map_center(std::iter::empty()), DEFAULT_MAP_CENTER);
    }
}
