//! In-memory R-tree of labelled polygons for point lookups.

use geo::{Area, BoundingRect, Intersects, Polygon};
use rstar::{AABB, RTree, RTreeObject};
use sales_map_customer_models::GeoPoint;

/// A polygon stored in the R-tree with its label.
struct IndexedPolygon<K> {
    key: K,
    area: f64,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl<K> RTreeObject for IndexedPolygon<K> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Bulk-loaded R-tree over polygons, each labelled with a key `K`.
///
/// Polygons may overlap. A point on a polygon's boundary counts as inside,
/// since hull vertices are themselves member points.
pub struct PolygonIndex<K> {
    tree: RTree<IndexedPolygon<K>>,
}

impl<K> PolygonIndex<K> {
    /// Builds the index from `(key, polygon)` pairs.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (K, Polygon<f64>)>) -> Self {
        let entries: Vec<IndexedPolygon<K>> = entries
            .into_iter()
            .map(|(key, polygon)| IndexedPolygon {
                key,
                area: polygon.unsigned_area(),
                envelope: compute_envelope(&polygon),
                polygon,
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Keys of every polygon containing `point`, smallest area first.
    #[must_use]
    pub fn containing(&self, point: GeoPoint) -> Vec<&K> {
        let target = geo::Point::new(point.longitude, point.latitude);
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        let mut hits: Vec<&IndexedPolygon<K>> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&target))
            .collect();
        hits.sort_by(|a, b| a.area.total_cmp(&b.area));

        hits.into_iter().map(|entry| &entry.key).collect()
    }

    /// Key of the smallest polygon containing `point`.
    #[must_use]
    pub fn smallest_containing(&self, point: GeoPoint) -> Option<&K> {
        let target = geo::Point::new(point.longitude, point.latitude);
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        let mut best: Option<&IndexedPolygon<K>> = None;

        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.intersects(&target) {
                match best {
                    None => best = Some(entry),
                    Some(current) if entry.area < current.area => {
                        best = Some(entry);
                    }
                    _ => {}
                }
            }
        }

        best.map(|entry| &entry.key)
    }
}

/// Compute the bounding box envelope for a [`Polygon`].
fn compute_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use geo::{LineString, polygon};

    use super::*;

    fn square(min: f64, max: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(min, min), (max, min), (max, max), (min, max)]),
            vec![],
        )
    }

    #[test]
    fn finds_overlapping_polygons_smallest_first() {
        let index = PolygonIndex::new([("big", square(0.0, 10.0)), ("small", square(4.0, 6.0))]);
        assert_eq!(index.len(), 2);

        assert_eq!(
            index.containing(GeoPoint::new(5.0, 5.0)),
            vec![&"small", &"big"]
        );
        assert_eq!(
            index.smallest_containing(GeoPoint::new(5.0, 5.0)),
            Some(&"small")
        );
        assert_eq!(index.containing(GeoPoint::new(1.0, 1.0)), vec![&"big"]);
    }

    #[test]
    fn boundary_points_count_as_inside() {
        let triangle = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 0.0, y: 4.0)];
        let index = PolygonIndex::new([(1_u32, triangle)]);

        assert_eq!(index.smallest_containing(GeoPoint::new(0.0, 0.0)), Some(&1));
        assert_eq!(index.smallest_containing(GeoPoint::new(2.0, 2.0)), Some(&1));
        assert_eq!(index.smallest_containing(GeoPoint::new(3.0, 3.0)), None);
    }

    #[test]
    fn empty_index() {
        let index: PolygonIndex<u32> = PolygonIndex::new([]);
        assert!(index.is_empty());
        assert!(index.containing(GeoPoint::new(0.0, 0.0)).is_empty());
    }
}
