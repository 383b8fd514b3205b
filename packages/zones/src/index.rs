//! Point-in-zone lookups for customer drill-down.

use geo::{LineString, Polygon};
use sales_map_customer_models::GeoPoint;
use sales_map_spatial::PolygonIndex;
use sales_map_zones_models::Zone;

/// R-tree over a set of built zones.
///
/// Zones of one rep's routes overlap, so a point can fall inside several
/// zones; lookups return them smallest first.
pub struct ZoneIndex<'a> {
    zones: &'a [Zone],
    index: PolygonIndex<usize>,
}

impl<'a> ZoneIndex<'a> {
    /// Indexes `zones` by their hull polygons.
    #[must_use]
    pub fn new(zones: &'a [Zone]) -> Self {
        let index = PolygonIndex::new(zones.iter().enumerate().map(|(i, zone)| {
            let ring: LineString<f64> = zone
                .points
                .iter()
                .map(|p| (p.longitude, p.latitude))
                .collect::<Vec<_>>()
                .into();
            (i, Polygon::new(ring, vec![]))
        }));

        log::debug!("Indexed {} zones", index.len());

        Self { zones, index }
    }

    /// Every zone whose polygon contains or touches `point`, smallest first.
    #[must_use]
    pub fn zones_at(&self, point: GeoPoint) -> Vec<&'a Zone> {
        let zones = self.zones;
        self.index
            .containing(point)
            .into_iter()
            .map(|&i| &zones[i])
            .collect()
    }

    /// The smallest zone containing `point`.
    #[must_use]
    pub fn smallest_zone_at(&self, point: GeoPoint) -> Option<&'a Zone> {
        let zones = self.zones;
        self.index.smallest_containing(point).map(|&i| &zones[i])
    }
}
