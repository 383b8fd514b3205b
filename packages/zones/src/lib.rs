#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Zone builder: groups geocoded customers by delivery route (or by sales
//! rep and route), strips spatial outliers from each group and draws the
//! convex hull of what remains.
//!
//! Groups that cannot produce a hull (fewer than three points, or points
//! that are collinear) are dropped from the result rather than reported as
//! errors, so a single sparse route never blanks out the whole map.

pub mod index;

use std::collections::{BTreeMap, BTreeSet};

use geo::Coord;
use sales_map_customer_models::{BranchId, CustomerId, CustomerRow, GeoPoint, RepId, RouteId};
use sales_map_spatial::{
    MIN_HULL_POINTS, convex_hull, filter_outliers_iqr, to_coord, to_geo_point,
};
use sales_map_zones_models::{Zone, ZoneGrouping, ZoneStyle};

pub use index::ZoneIndex;

/// Fill opacity of a rep's first route.
const REP_ROUTE_FILL_ALPHA: f64 = 0.15;
/// Fill opacity added per additional route of the same rep.
const REP_ROUTE_FILL_STEP: f64 = 0.05;
const REP_ROUTE_FILL_MAX: f64 = 0.4;
/// Border opacity of a rep's first route.
const REP_ROUTE_BORDER_ALPHA: f64 = 0.7;
/// Border opacity added per additional route of the same rep.
const REP_ROUTE_BORDER_STEP: f64 = 0.1;
const REP_ROUTE_BORDER_MAX: f64 = 1.0;

/// Hull ring of one group plus how many points shaped it.
struct GroupShape {
    ring: Vec<GeoPoint>,
    filtered_count: usize,
}

/// Builds zones with the default palette, starting at palette index 0.
#[must_use]
pub fn build_zones(rows: &[CustomerRow], grouping: ZoneGrouping) -> Vec<Zone> {
    build_zones_with(rows, grouping, &ZoneStyle::default())
}

/// Builds zones with an explicit palette and starting color offset.
///
/// * [`ZoneGrouping::Route`] emits one zone per `(branch, route)`; the
///   palette index advances once per emitted zone.
/// * [`ZoneGrouping::Rep`] emits one zone per route of each
///   `(rep, branch)`; the palette index advances once per rep and the
///   rep's routes are told apart by increasing opacity.
///
/// Rows with an invalid geocode or without the grouping keys are skipped.
/// Groups are visited in key order, so output order and colors are a pure
/// function of the input.
#[must_use]
pub fn build_zones_with(
    rows: &[CustomerRow],
    grouping: ZoneGrouping,
    style: &ZoneStyle,
) -> Vec<Zone> {
    let zones = match grouping {
        ZoneGrouping::Route => route_zones(rows, style),
        ZoneGrouping::Rep => rep_zones(rows, style),
    };

    log::debug!(
        "Built {} {grouping} zones from {} rows",
        zones.len(),
        rows.len()
    );

    zones
}

fn route_zones(rows: &[CustomerRow], style: &ZoneStyle) -> Vec<Zone> {
    let mut groups: BTreeMap<(Option<&BranchId>, &RouteId), Vec<&CustomerRow>> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.point.is_valid()) {
        let Some(route) = row.assigned_route() else {
            continue;
        };
        groups
            .entry((row.known_branch(), route))
            .or_default()
            .push(row);
    }

    let mut zones = Vec::new();
    let mut color_index = style.color_offset;

    for ((branch, route), members) in groups {
        let name = route_zone_name(route, branch);
        let Some(shape) = shape_group(&name, &members) else {
            continue;
        };

        let colors = style.palette.get(color_index);
        zones.push(Zone {
            name,
            route: route.clone(),
            branch: branch.cloned(),
            rep: None,
            points: shape.ring,
            member_customer_ids: member_ids(&members),
            member_count_total: members.len(),
            member_count_after_outlier_filter: shape.filtered_count,
            fill_color: colors.fill,
            border_color: colors.border,
            palette_index: color_index,
        });
        color_index += 1;
    }

    zones
}

type RepRoutes<'a> = BTreeMap<&'a RouteId, Vec<&'a CustomerRow>>;

fn rep_zones(rows: &[CustomerRow], style: &ZoneStyle) -> Vec<Zone> {
    let mut reps: BTreeMap<(&RepId, Option<&BranchId>), RepRoutes<'_>> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.point.is_valid()) {
        let (Some(rep), Some(route)) = (row.assigned_rep(), row.assigned_route()) else {
            continue;
        };
        reps.entry((rep, row.known_branch()))
            .or_default()
            .entry(route)
            .or_default()
            .push(row);
    }

    let mut zones = Vec::new();
    let mut color_index = style.color_offset;

    for ((rep, branch), routes) in reps {
        let base = style.palette.get(color_index);
        let mut route_number = 0;

        for (route, members) in routes {
            let name = rep_zone_name(rep, branch, route);
            let Some(shape) = shape_group(&name, &members) else {
                continue;
            };

            let (fill_alpha, border_alpha) = rep_route_alphas(route_number);
            zones.push(Zone {
                name,
                route: route.clone(),
                branch: branch.cloned(),
                rep: Some(rep.clone()),
                points: shape.ring,
                member_customer_ids: member_ids(&members),
                member_count_total: members.len(),
                member_count_after_outlier_filter: shape.filtered_count,
                fill_color: base.fill.with_alpha(fill_alpha),
                border_color: base.border.with_alpha(border_alpha),
                palette_index: color_index,
            });
            route_number += 1;
        }

        color_index += 1;
    }

    zones
}

/// Filters outliers from a group and computes its hull, or `None` if the
/// group cannot form a zone.
fn shape_group(name: &str, members: &[&CustomerRow]) -> Option<GroupShape> {
    if members.len() < MIN_HULL_POINTS {
        log::debug!(
            "Skipping zone {name}: {} points, need {MIN_HULL_POINTS}",
            members.len()
        );
        return None;
    }

    let coords: Vec<Coord<f64>> = members.iter().map(|r| to_coord(r.point)).collect();
    let filtered = filter_outliers_iqr(&coords);

    match convex_hull(&filtered) {
        Ok(hull) => Some(GroupShape {
            ring: hull.exterior().coords().copied().map(to_geo_point).collect(),
            filtered_count: filtered.len(),
        }),
        Err(e) => {
            log::debug!("Skipping zone {name}: {e}");
            None
        }
    }
}

fn member_ids(members: &[&CustomerRow]) -> BTreeSet<CustomerId> {
    members.iter().map(|r| r.customer_id.clone()).collect()
}

fn route_zone_name(route: &RouteId, branch: Option<&BranchId>) -> String {
    branch.map_or_else(|| route.to_string(), |b| format!("{route} ({b})"))
}

fn rep_zone_name(rep: &RepId, branch: Option<&BranchId>, route: &RouteId) -> String {
    branch.map_or_else(
        || format!("{rep} - {route}"),
        |b| format!("{rep} ({b}) - {route}"),
    )
}

/// Fill and border opacity for the `n`-th emitted route of one rep.
#[allow(clippy::cast_precision_loss)]
fn rep_route_alphas(n: usize) -> (f64, f64) {
    let n = n as f64;
    (
        REP_ROUTE_FILL_STEP
            .mul_add(n, REP_ROUTE_FILL_ALPHA)
            .min(REP_ROUTE_FILL_MAX),
        REP_ROUTE_BORDER_STEP
            .mul_add(n, REP_ROUTE_BORDER_ALPHA)
            .min(REP_ROUTE_BORDER_MAX),
    )
}

#[cfg(test)]
mod tests {
    use geo::{Area, Intersects, LineString, Point, Polygon};
    use sales_map_zones_models::{ZoneColors, ZonePalette};

    use super::*;

    fn row(id: &str, lat: f64, lon: f64) -> CustomerRow {
        CustomerRow::new(id, GeoPoint::new(lon, lat))
    }

    fn on_route(rows: Vec<CustomerRow>, route: &str, branch: &str) -> Vec<CustomerRow> {
        rows.into_iter()
            .map(|r| r.with_route(route).with_branch(branch))
            .collect()
    }

    fn polygon_of(zone: &Zone) -> Polygon<f64> {
        Polygon::new(
            LineString::from(
                zone.points
                    .iter()
                    .map(|p| (p.longitude, p.latitude))
                    .collect::<Vec<_>>(),
            ),
            vec![],
        )
    }

    /// Loose cluster around Salta with two increasingly distant points.
    fn cluster(prefix: &str, d_lon: f64, d_lat: f64) -> Vec<CustomerRow> {
        [
            (-24.80, -65.40),
            (-24.79, -65.42),
            (-24.81, -65.38),
            (-24.83, -65.41),
            (-24.77, -65.39),
            (-24.82, -65.43),
            (-24.78, -65.37),
            (-24.76, -65.40),
            (-24.70, -65.30),
            (-24.00, -65.00),
        ]
        .iter()
        .enumerate()
        .map(|(i, (lat, lon))| row(&format!("{prefix}{i}"), lat + d_lat, lon + d_lon))
        .collect()
    }

    #[test]
    fn outlier_is_excluded_from_route_zone() {
        let rows = on_route(
            vec![
                row("1", -24.80, -65.40),
                row("2", -24.81, -65.41),
                row("3", -24.79, -65.39),
                row("4", -24.80, -65.40),
                row("5", -50.0, -65.40),
            ],
            "R1",
            "B1",
        );

        let zones = build_zones(&rows, ZoneGrouping::Route);
        assert_eq!(zones.len(), 1);

        let zone = &zones[0];
        assert_eq!(zone.name, "R1 (B1)");
        assert_eq!(zone.member_count_total, 5);
        assert_eq!(zone.member_count_after_outlier_filter, 4);
        assert_eq!(zone.member_customer_ids.len(), 5);
        assert!(zone.member_customer_ids.contains(&CustomerId::new("5")));
        assert!(zone.points.iter().all(|p| p.latitude > -30.0));
        assert_eq!(zone.points.first(), zone.points.last());
    }

    #[test]
    fn hull_contains_filtered_members() {
        let rows = on_route(cluster("c", 0.0, 0.0), "R7", "B2");
        let zones = build_zones(&rows, ZoneGrouping::Route);
        assert_eq!(zones.len(), 1);

        let polygon = polygon_of(&zones[0]);
        let coords: Vec<Coord<f64>> = rows.iter().map(|r| to_coord(r.point)).collect();
        for c in filter_outliers_iqr(&coords) {
            assert!(
                polygon.intersects(&Point::from(c)),
                "{c:?} is a filtered member outside the hull"
            );
        }
    }

    #[test]
    fn removing_farthest_point_never_grows_the_hull() {
        let mut rows = on_route(cluster("c", 0.0, 0.0), "R7", "B2");
        let mut previous_area = f64::INFINITY;

        while rows.len() >= 4 {
            let zones = build_zones(&rows, ZoneGrouping::Route);
            assert_eq!(zones.len(), 1);
            let area = polygon_of(&zones[0]).unsigned_area();
            assert!(
                area <= previous_area + 1e-12,
                "area grew from {previous_area} to {area} with {} rows",
                rows.len()
            );
            previous_area = area;

            let coords: Vec<Coord<f64>> = rows.iter().map(|r| to_coord(r.point)).collect();
            let center = sales_map_spatial::centroid(&coords).unwrap();
            let farthest = coords
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    let da = (a.x - center.x).hypot(a.y - center.y);
                    let db = (b.x - center.x).hypot(b.y - center.y);
                    da.total_cmp(&db)
                })
                .map(|(i, _)| i)
                .unwrap();
            rows.remove(farthest);
        }
    }

    #[test]
    fn same_route_number_in_two_branches_makes_two_zones() {
        let mut rows = on_route(cluster("a", 0.0, 0.0), "101", "Norte");
        rows.extend(on_route(cluster("b", 1.0, 1.0), "101", "Sur"));

        let zones = build_zones(&rows, ZoneGrouping::Route);
        let names: Vec<&str> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["101 (Norte)", "101 (Sur)"]);
        assert_eq!(zones[0].palette_index, 0);
        assert_eq!(zones[1].palette_index, 1);
        assert_ne!(zones[0].fill_color, zones[1].fill_color);
    }

    #[test]
    fn unassigned_routes_and_small_groups_are_dropped() {
        let mut rows = on_route(cluster("a", 0.0, 0.0), "Sin ruta", "B1");
        rows.extend(on_route(cluster("b", 0.0, 0.0), "", "B1"));
        rows.extend(on_route(
            vec![row("x", -24.8, -65.4), row("y", -24.9, -65.5)],
            "R2",
            "B1",
        ));

        assert!(build_zones(&rows, ZoneGrouping::Route).is_empty());
    }

    #[test]
    fn collinear_group_is_dropped_without_affecting_others() {
        let mut rows = on_route(
            vec![
                row("1", 0.0, 1.0),
                row("2", 1.0, 2.0),
                row("3", 2.0, 3.0),
                row("4", 3.0, 4.0),
            ],
            "LINE",
            "B1",
        );
        rows.extend(on_route(cluster("c", 0.0, 0.0), "R1", "B1"));

        let zones = build_zones(&rows, ZoneGrouping::Route);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "R1 (B1)");
        assert_eq!(zones[0].palette_index, 0);
    }

    #[test]
    fn zone_without_branch_uses_route_name() {
        let rows: Vec<CustomerRow> = cluster("c", 0.0, 0.0)
            .into_iter()
            .map(|r| r.with_route("R9").with_branch("Sin sucursal"))
            .collect();

        let zones = build_zones(&rows, ZoneGrouping::Route);
        assert_eq!(zones[0].name, "R9");
        assert!(zones[0].branch.is_none());
    }

    #[test]
    fn rep_grouping_emits_one_zone_per_route() {
        let mut rows = Vec::new();
        for (i, route) in ["R1", "R2", "R3"].iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let shift = i as f64 * 0.5;
            rows.extend(
                on_route(cluster(route, shift, shift), route, "B1")
                    .into_iter()
                    .map(|r| r.with_rep("Ana")),
            );
        }
        rows.extend(
            on_route(cluster("z", 3.0, 3.0), "R1", "B1")
                .into_iter()
                .map(|r| r.with_rep("Beto")),
        );

        let zones = build_zones(&rows, ZoneGrouping::Rep);
        let names: Vec<&str> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Ana (B1) - R1",
                "Ana (B1) - R2",
                "Ana (B1) - R3",
                "Beto (B1) - R1"
            ]
        );

        // One palette slot per rep, opacity rising per route.
        assert!(zones[..3].iter().all(|z| z.palette_index == 0));
        assert_eq!(zones[3].palette_index, 1);
        assert!(zones[0].fill_color.a < zones[1].fill_color.a);
        assert!(zones[1].fill_color.a < zones[2].fill_color.a);
        assert!(zones[0].border_color.a < zones[1].border_color.a);
        assert!((zones[0].fill_color.a - 0.15).abs() < 1e-12);
        assert!((zones[0].border_color.a - 0.7).abs() < 1e-12);
        assert_eq!(zones[3].fill_color.r, zones[3].border_color.r);
        assert_ne!(
            (zones[0].fill_color.r, zones[0].fill_color.g, zones[0].fill_color.b),
            (zones[3].fill_color.r, zones[3].fill_color.g, zones[3].fill_color.b)
        );
    }

    #[test]
    fn rep_grouping_skips_rows_without_rep() {
        let rows = on_route(cluster("c", 0.0, 0.0), "R1", "B1");
        assert!(build_zones(&rows, ZoneGrouping::Rep).is_empty());
    }

    #[test]
    fn rep_without_zones_still_takes_a_palette_slot() {
        let mut rows: Vec<CustomerRow> = on_route(cluster("a", 0.0, 0.0), "R1", "B1")
            .into_iter()
            .map(|r| r.with_rep("Ana"))
            .collect();
        rows.extend(
            on_route(vec![row("b1", -24.8, -65.4), row("b2", -24.9, -65.5)], "R1", "B1")
                .into_iter()
                .map(|r| r.with_rep("Beto")),
        );
        rows.extend(
            on_route(
                vec![
                    row("b3", 0.0, 1.0),
                    row("b4", 1.0, 2.0),
                    row("b5", 2.0, 3.0),
                    row("b6", 3.0, 4.0),
                ],
                "R2",
                "B1",
            )
            .into_iter()
            .map(|r| r.with_rep("Beto")),
        );
        rows.extend(
            on_route(cluster("c", 2.0, 2.0), "R1", "B1")
                .into_iter()
                .map(|r| r.with_rep("Carla")),
        );

        let zones = build_zones(&rows, ZoneGrouping::Rep);
        let names: Vec<&str> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["Ana (B1) - R1", "Carla (B1) - R1"]);
        assert_eq!(zones[0].palette_index, 0);
        assert_eq!(zones[1].palette_index, 2);
        assert_eq!(zones[1].fill_color.r, ZonePalette::default().get(2).fill.r);
    }

    #[test]
    fn dropped_route_does_not_advance_rep_opacity() {
        let mut rows: Vec<CustomerRow> = on_route(
            vec![row("x1", -24.8, -65.4), row("x2", -24.9, -65.5)],
            "A0",
            "B1",
        );
        rows.extend(on_route(cluster("a", 0.0, 0.0), "A1", "B1"));
        rows.extend(on_route(cluster("b", 1.0, 1.0), "A2", "B1"));
        let rows: Vec<CustomerRow> = rows.into_iter().map(|r| r.with_rep("Dana")).collect();

        let zones = build_zones(&rows, ZoneGrouping::Rep);
        let names: Vec<&str> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["Dana (B1) - A1", "Dana (B1) - A2"]);
        assert!((zones[0].fill_color.a - 0.15).abs() < 1e-12);
        assert!((zones[0].border_color.a - 0.7).abs() < 1e-12);
        assert!((zones[1].fill_color.a - 0.2).abs() < 1e-12);
        assert!((zones[1].border_color.a - 0.8).abs() < 1e-12);
    }

    #[test]
    fn rep_zone_without_branch_drops_the_branch_label() {
        let rows: Vec<CustomerRow> = cluster("c", 0.0, 0.0)
            .into_iter()
            .map(|r| r.with_route("R4").with_branch("Sin sucursal").with_rep("Ana"))
            .collect();

        let zones = build_zones(&rows, ZoneGrouping::Rep);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "Ana - R4");
        assert!(zones[0].branch.is_none());
        assert_eq!(zones[0].rep, Some(RepId::new("Ana")));
    }

    #[test]
    fn rep_route_opacity_is_capped() {
        assert_eq!(rep_route_alphas(100), (0.4, 1.0));
        let (fill, border) = rep_route_alphas(2);
        assert!((fill - 0.25).abs() < 1e-12);
        assert!((border - 0.9).abs() < 1e-12);
    }

    #[test]
    fn explicit_palette_and_offset() {
        let colors = |v: u8| ZoneColors {
            fill: sales_map_zones_models::Rgba::new(v, v, v, 0.2),
            border: sales_map_zones_models::Rgba::new(v, v, v, 0.8),
        };
        let style = ZoneStyle {
            palette: ZonePalette::new(vec![colors(10), colors(20)]).unwrap(),
            color_offset: 1,
        };

        let mut rows = on_route(cluster("a", 0.0, 0.0), "R1", "B1");
        rows.extend(on_route(cluster("b", 1.0, 1.0), "R2", "B1"));
        rows.extend(on_route(cluster("c", 2.0, 2.0), "R3", "B1"));

        let zones = build_zones_with(&rows, ZoneGrouping::Route, &style);
        let reds: Vec<u8> = zones.iter().map(|z| z.fill_color.r).collect();
        assert_eq!(reds, vec![20, 10, 20]);
        assert_eq!(
            zones.iter().map(|z| z.palette_index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn zones_are_deterministic() {
        let mut rows = on_route(cluster("a", 0.0, 0.0), "R2", "B1");
        rows.extend(on_route(cluster("b", 1.0, 1.0), "R1", "B1"));

        let first = build_zones(&rows, ZoneGrouping::Route);
        rows.reverse();
        let second = build_zones(&rows, ZoneGrouping::Route);

        let names = |zones: &[Zone]| zones.iter().map(|z| z.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first), vec!["R1 (B1)", "R2 (B1)"]);
    }
}
