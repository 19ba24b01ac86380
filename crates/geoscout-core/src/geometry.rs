//! Planar geometry on small areas: point-in-polygon and distance to a polyline.
//!
//! Polygons are treated in lng/lat space, which is accurate enough for
//! isochrone-sized areas (tens of kilometres). Distances to line segments use
//! a local equirectangular projection around the query point.

use crate::location::{Location, METRES_PER_LAT_DEGREE};

/// Ray-casting containment test against a closed ring.
///
/// The ring may or may not repeat its first vertex at the end.
#[must_use]
pub fn point_in_ring(point: &Location, ring: &[Location]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let (x, y) = (point.lng(), point.lat());
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].lng(), ring[i].lat());
        let (xj, yj) = (ring[j].lng(), ring[j].lat());
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Containment against an exterior ring with optional holes.
#[must_use]
pub fn point_in_polygon(point: &Location, exterior: &[Location], holes: &[Vec<Location>]) -> bool {
    point_in_ring(point, exterior) && !holes.iter().any(|hole| point_in_ring(point, hole))
}

/// Shortest distance in metres from `point` to the polyline `line`.
///
/// A single-vertex line degenerates to point distance; an empty line yields
/// `f64::INFINITY`.
#[must_use]
pub fn distance_to_polyline_m(point: &Location, line: &[Location]) -> f64 {
    match line {
        [] => f64::INFINITY,
        [only] => point.distance_to(only),
        _ => line
            .windows(2)
            .map(|seg| distance_to_segment_m(point, &seg[0], &seg[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

fn distance_to_segment_m(p: &Location, a: &Location, b: &Location) -> f64 {
    let lng_scale = METRES_PER_LAT_DEGREE * p.lat().to_radians().cos().max(1e-6);
    let project = |l: &Location| {
        (
            (l.lng() - p.lng()) * lng_scale,
            (l.lat() - p.lat()) * METRES_PER_LAT_DEGREE,
        )
    };
    let (ax, ay) = project(a);
    let (bx, by) = project(b);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        ((-ax) * dx + (-ay) * dy) / len_sq
    }
    .clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}

/// Approximates a circle of `radius_m` around `center` as a closed ring.
#[must_use]
pub fn circle_ring(center: &Location, radius_m: f64, vertices: usize) -> Vec<Location> {
    let n = vertices.max(3);
    let mut ring: Vec<Location> = (0..n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let theta = std::f64::consts::TAU * i as f64 / n as f64;
            center.offset(radius_m * theta.sin(), radius_m * theta.cos())
        })
        .collect();
    if let Some(first) = ring.first().cloned() {
        ring.push(first);
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lng: f64) -> Location {
        Location::new(lat, lng).unwrap()
    }

    fn unit_square() -> Vec<Location> {
        vec![
            loc(0.0, 0.0),
            loc(0.0, 1.0),
            loc(1.0, 1.0),
            loc(1.0, 0.0),
            loc(0.0, 0.0),
        ]
    }

    #[test]
    fn point_inside_and_outside_square() {
        let ring = unit_square();
        assert!(point_in_ring(&loc(0.5, 0.5), &ring));
        assert!(!point_in_ring(&loc(1.5, 0.5), &ring));
        assert!(!point_in_ring(&loc(0.5, -0.1), &ring));
    }

    #[test]
    fn holes_exclude_points() {
        let hole = vec![
            loc(0.4, 0.4),
            loc(0.4, 0.6),
            loc(0.6, 0.6),
            loc(0.6, 0.4),
        ];
        let square = unit_square();
        assert!(!point_in_polygon(&loc(0.5, 0.5), &square, &[hole.clone()]));
        assert!(point_in_polygon(&loc(0.2, 0.2), &square, &[hole]));
    }

    #[test]
    fn degenerate_ring_contains_nothing() {
        assert!(!point_in_ring(&loc(0.0, 0.0), &[loc(0.0, 0.0), loc(1.0, 1.0)]));
    }

    #[test]
    fn circle_ring_contains_points_inside_radius_only() {
        let center = loc(51.5074, -0.1278);
        let ring = circle_ring(&center, 500.0, 64);
        assert!(point_in_ring(&center.offset(0.0, 100.0), &ring));
        assert!(point_in_ring(&center.offset(0.0, 400.0), &ring));
        assert!(!point_in_ring(&center.offset(0.0, 900.0), &ring));
    }

    #[test]
    fn polyline_distance_measures_perpendicular_offset() {
        let a = loc(51.5, -0.2);
        let b = loc(51.5, -0.1);
        let p = loc(51.5, -0.15).offset(250.0, 0.0);
        let d = distance_to_polyline_m(&p, &[a, b]);
        assert!((d - 250.0).abs() < 3.0, "got {d}");
    }

    #[test]
    fn polyline_distance_beyond_endpoint_uses_endpoint() {
        let a = loc(0.0, 0.0);
        let b = loc(0.0, 0.01);
        let p = loc(0.0, 0.02);
        let d = distance_to_polyline_m(&p, &[a, b.clone()]);
        assert!((d - p.distance_to(&b)).abs() < 5.0, "got {d}");
        assert!(distance_to_polyline_m(&p, &[]).is_infinite());
    }
}
