//! Circle synthesis and small polygon helpers.
//!
//! Distances use an equirectangular approximation (111.32 km per degree of
//! latitude), which is good enough for the tens of kilometres an isochrone
//! service is willing to cover.

use geo::{BoundingRect, ChamberlainDuquetteArea, Coord, LineString, Polygon};
use std::f64::consts::PI;

use crate::model::{BoundingBox, GeoPoint};

pub const KM_PER_DEGREE: f64 = 111.32;
pub const DEFAULT_POINT_COUNT: usize = 64;

/// Regular polygon approximating a circle of `radius_km` around `center`.
///
/// The ring is closed, so it holds `point_count + 1` coordinates. `center`
/// must not sit on a pole.
pub fn circle(center: GeoPoint, radius_km: f64, point_count: usize) -> Polygon<f64> {
    let lng_scale = KM_PER_DEGREE * (center.latitude * PI / 180.0).cos();

    let mut ring: Vec<Coord<f64>> = (0..point_count)
        .map(|i| {
            let angle = i as f64 * 2.0 * PI / point_count as f64;
            let dx = angle.cos() * radius_km;
            let dy = angle.sin() * radius_km;
            Coord {
                x: center.longitude + dx / lng_scale,
                y: center.latitude + dy / KM_PER_DEGREE,
            }
        })
        .collect();

    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }

    Polygon::new(LineString::new(ring), vec![])
}

pub fn circle_area_km2(radius_km: f64) -> f64 {
    PI * radius_km * radius_km
}

/// Spherical area of a lng/lat polygon.
pub fn polygon_area_km2(polygon: &Polygon<f64>) -> f64 {
    polygon.chamberlain_duquette_unsigned_area() / 1_000_000.0
}

pub fn bounding_box(polygon: &Polygon<f64>) -> Option<BoundingBox> {
    polygon.bounding_rect().map(|rect| BoundingBox {
        west: rect.min().x,
        south: rect.min().y,
        east: rect.max().x,
        north: rect.max().y,
    })
}

/// Converts a GeoJSON polygon into a `geo` polygon.
///
/// Returns `None` for other geometry types, positions with fewer than two
/// ordinates, and exterior rings that are not closed or have fewer than four
/// positions.
pub fn polygon_from_geojson(value: &geojson::Value) -> Option<Polygon<f64>> {
    let geojson::Value::Polygon(rings) = value else {
        return None;
    };

    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .map(|position| match position.as_slice() {
                [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
    });

    let exterior = rings.next()??;
    if exterior.len() < 4 || exterior.first() != exterior.last() {
        return None;
    }

    let interiors = rings
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .map(LineString::new)
        .collect();

    Some(Polygon::new(LineString::new(exterior), interiors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landau() -> GeoPoint {
        GeoPoint::new(49.1983, 8.1172)
    }

    #[test]
    fn default_circle_is_closed_with_65_positions() {
        for (lat, radius) in [(0.0, 0.1), (49.1983, 2.5), (-88.9, 40.0), (60.0, 50.0)] {
            let polygon = circle(GeoPoint::new(lat, 13.4), radius, DEFAULT_POINT_COUNT);
            let ring = &polygon.exterior().0;
            assert_eq!(ring.len(), 65);
            assert_eq!(ring.first(), ring.last());
            assert!(polygon.interiors().is_empty());
        }
    }

    #[test]
    fn ring_points_sit_at_radius_before_projection() {
        let center = landau();
        let polygon = circle(center, 2.5, DEFAULT_POINT_COUNT);
        let lng_scale = KM_PER_DEGREE * center.latitude.to_radians().cos();

        for coord in polygon.exterior().0.iter().take(DEFAULT_POINT_COUNT) {
            let dx = (coord.x - center.longitude) * lng_scale;
            let dy = (coord.y - center.latitude) * KM_PER_DEGREE;
            assert!((dx.hypot(dy) - 2.5).abs() < 1e-9);
        }

        let bbox = bounding_box(&polygon).expect("circle has a bounding box");
        assert!(bbox.contains(center));
    }

    #[test]
    fn first_point_lies_due_east() {
        let center = landau();
        let polygon = circle(center, 1.0, 8);
        let first = polygon.exterior().0[0];
        assert_eq!(first.y, center.latitude);
        assert!(first.x > center.longitude);
        assert_eq!(polygon.exterior().0.len(), 9);
    }

    #[test]
    fn circle_is_deterministic() {
        let a = circle(landau(), 3.7, DEFAULT_POINT_COUNT);
        let b = circle(landau(), 3.7, DEFAULT_POINT_COUNT);
        assert_eq!(a, b);
    }

    #[test]
    fn spherical_area_tracks_planar_formula_for_small_circles() {
        let polygon = circle(landau(), 2.5, DEFAULT_POINT_COUNT);
        let expected = circle_area_km2(2.5);
        let actual = polygon_area_km2(&polygon);
        // the 64-gon is slightly smaller than the true circle
        assert!((actual - expected).abs() / expected < 0.02, "{actual} vs {expected}");
    }

    #[test]
    fn geojson_polygon_conversion() {
        let closed = geojson::Value::Polygon(vec![vec![
            vec![8.0, 49.0],
            vec![8.1, 49.0],
            vec![8.1, 49.1],
            vec![8.0, 49.0],
        ]]);
        let polygon = polygon_from_geojson(&closed).expect("valid polygon");
        assert_eq!(polygon.exterior().0.len(), 4);

        let open = geojson::Value::Polygon(vec![vec![
            vec![8.0, 49.0],
            vec![8.1, 49.0],
            vec![8.1, 49.1],
            vec![8.0, 49.1],
        ]]);
        assert!(polygon_from_geojson(&open).is_none());

        let too_short = geojson::Value::Polygon(vec![vec![vec![8.0, 49.0], vec![8.0, 49.0]]]);
        assert!(polygon_from_geojson(&too_short).is_none());

        let empty = geojson::Value::Polygon(vec![]);
        assert!(polygon_from_geojson(&empty).is_none());

        let point = geojson::Value::Point(vec![8.0, 49.0]);
        assert!(polygon_from_geojson(&point).is_none());
    }
}
