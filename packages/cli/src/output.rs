//! GeoJSON encoding of zone and heat layers.

use std::collections::BTreeMap;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use sales_map_customer_models::{CustomerRow, GeoPoint, MeasureName};
use sales_map_heatmap_models::{BubbleLayer, ColorTier, DensityLayer, LatLon};
use sales_map_spatial::map_center;
use sales_map_zones::ZoneIndex;
use sales_map_zones_models::Zone;
use serde_json::json;

fn position(point: GeoPoint) -> Vec<f64> {
    vec![point.longitude, point.latitude]
}

fn feature(value: Value, properties: serde_json::Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: match properties {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        },
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>, extra: serde_json::Value) -> FeatureCollection {
    let foreign_members: Option<JsonObject> = match extra {
        serde_json::Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    };

    FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// One `Polygon` feature per zone, centered on the zones' members.
#[must_use]
pub fn zones_to_geojson(zones: &[Zone]) -> FeatureCollection {
    let features = zones
        .iter()
        .map(|zone| {
            let ring = zone.points.iter().copied().map(position).collect();
            feature(
                Value::Polygon(vec![ring]),
                json!({
                    "name": zone.name,
                    "route": zone.route,
                    "branch": zone.branch,
                    "rep": zone.rep,
                    "fillColor": zone.fill_color.to_string(),
                    "borderColor": zone.border_color.to_string(),
                    "paletteIndex": zone.palette_index,
                    "memberCountTotal": zone.member_count_total,
                    "memberCountAfterOutlierFilter": zone.member_count_after_outlier_filter,
                    "memberCustomerIds": zone.member_customer_ids,
                }),
            )
        })
        .collect();

    let center = map_center(zones.iter().flat_map(|z| z.points.iter().copied()));
    collection(features, json!({ "center": center }))
}

/// Splits a `None`-separated polygon batch into closed rings.
fn rings(batch: &[Option<LatLon>]) -> Vec<Vec<Vec<f64>>> {
    batch
        .split(Option::is_none)
        .filter(|ring| !ring.is_empty())
        .map(|ring| ring.iter().flatten().map(|v| vec![v.lon, v.lat]).collect())
        .collect()
}

/// One `MultiPolygon` feature per color tier, coldest first.
#[must_use]
pub fn tiers_to_geojson(
    tiers: &BTreeMap<usize, ColorTier>,
    measure: MeasureName,
) -> FeatureCollection {
    let features = tiers
        .values()
        .map(|tier| {
            let polygons = rings(&tier.polygon_coordinates)
                .into_iter()
                .map(|ring| vec![ring])
                .collect();
            feature(
                Value::MultiPolygon(polygons),
                json!({
                    "tierIndex": tier.tier_index,
                    "color": tier.color.to_string(),
                    "cellCount": tier.cell_count(),
                    "totalValue": tier.total_value,
                    "totalMembers": tier.total_members,
                }),
            )
        })
        .collect();

    collection(
        features,
        json!({ "measure": measure, "label": measure.label() }),
    )
}

/// One `Point` feature per weighted customer.
#[must_use]
pub fn density_to_geojson(layer: &DensityLayer, measure: MeasureName) -> FeatureCollection {
    let features = layer
        .points
        .iter()
        .map(|p| {
            feature(
                Value::Point(position(p.point)),
                json!({ "customerId": p.customer_id, "weight": p.weight }),
            )
        })
        .collect();

    collection(
        features,
        json!({
            "measure": measure,
            "label": measure.label(),
            "radius": layer.radius,
            "colorRange": layer.color_range,
            "center": layer.center,
        }),
    )
}

/// `Point` features for customers with sales (sized) and without.
#[must_use]
pub fn bubbles_to_geojson(layer: &BubbleLayer, measure: MeasureName) -> FeatureCollection {
    let with_sales = layer.with_sales.iter().map(|b| {
        feature(
            Value::Point(position(b.point)),
            json!({
                "customerId": b.customer_id,
                "hasSales": true,
                "value": b.value,
                "size": b.size,
            }),
        )
    });
    let without_sales = layer.without_sales.iter().map(|c| {
        feature(
            Value::Point(position(c.point)),
            json!({ "customerId": c.customer_id, "hasSales": false }),
        )
    });

    collection(
        with_sales.chain(without_sales).collect(),
        json!({
            "measure": measure,
            "label": measure.label(),
            "valueRange": layer.value_range,
            "center": layer.center,
        }),
    )
}

/// One `Point` feature per customer naming the zones it falls in.
#[must_use]
pub fn locations_to_geojson(rows: &[CustomerRow], index: &ZoneIndex<'_>) -> FeatureCollection {
    let features = rows
        .iter()
        .map(|row| {
            let zones: Vec<&str> = index
                .zones_at(row.point)
                .iter()
                .map(|z| z.name.as_str())
                .collect();
            feature(
                Value::Point(position(row.point)),
                json!({
                    "customerId": row.customer_id,
                    "zone": zones.first(),
                    "zones": zones,
                }),
            )
        })
        .collect();

    collection(features, json!({}))
}
