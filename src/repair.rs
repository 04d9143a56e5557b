use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Coord, Line, LineString, Polygon};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use log::{debug, warn};

use crate::geometry::{close_ring, open_coords, EPSILON};
use crate::ClipError;

/// Produces simple rings covering the same area as the input. A ring that's already simple is
/// returned as-is (closed, without repeated vertices). Self-intersecting rings are fixed with a
/// zero-width buffer and may come back as several rings, or none at all if no area survives.
///
/// Only fails for rings that can't describe an area at all.
pub fn repair(ring: &LineString) -> Result<Vec<LineString>, ClipError> {
    let pts = open_coords(ring);
    if pts.iter().any(|pt| !pt.x.is_finite() || !pt.y.is_finite()) {
        return Err(ClipError::GeometryRepairFailure(
            "ring has a non-finite coordinate".to_string(),
        ));
    }
    let distinct = count_distinct(&pts);
    if distinct < 3 {
        return Err(ClipError::GeometryRepairFailure(format!(
            "ring has only {distinct} distinct vertices"
        )));
    }

    let closed = close_ring(pts);
    if is_simple(&closed) {
        return Ok(vec![closed]);
    }

    debug!(
        "Repairing a self-intersecting ring with {} points",
        closed.0.len()
    );
    let mut contour = to_i_overlay_contour(&closed);
    // geo rings are explicitly closed, but i_overlay contours are not.
    contour.pop();

    // Unioning the ring with itself resolves every crossing, like buffering by zero
    let shapes = contour.overlay(&contour, OverlayRule::Union, FillRule::NonZero);

    let mut repaired = Vec::new();
    for mut contours in shapes {
        if contours.is_empty() {
            continue;
        }
        if contours.len() > 1 {
            debug!("Dropping {} holes from a repaired ring", contours.len() - 1);
        }
        let exterior = close_ring(to_geo_coords(contours.swap_remove(0)));
        if exterior.0.len() >= 4 && Polygon::new(exterior.clone(), Vec::new()).unsigned_area() > 0.0
        {
            repaired.push(exterior);
        }
    }
    if repaired.is_empty() {
        warn!("A self-intersecting ring had no area left after repair");
    }
    Ok(repaired)
}

/// Checks every pair of edges. Adjacent edges may only share their common vertex; any other
/// contact makes the ring non-simple.
pub fn is_simple(ring: &LineString) -> bool {
    let lines: Vec<Line> = ring.lines().collect();
    let n = lines.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(lines[i], lines[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(_) => return false,
            }
        }
    }
    true
}

fn count_distinct(pts: &[Coord]) -> usize {
    let mut distinct: Vec<Coord> = Vec::new();
    for pt in pts {
        if !distinct
            .iter()
            .any(|other| (other.x - pt.x).abs() <= EPSILON && (other.y - pt.y).abs() <= EPSILON)
        {
            distinct.push(*pt);
        }
    }
    distinct.len()
}

fn to_geo_coords(pts: Vec<[f64; 2]>) -> Vec<Coord> {
    pts.into_iter()
        .map(|pt| Coord { x: pt[0], y: pt[1] })
        .collect()
}

fn to_i_overlay_contour(line_string: &LineString) -> Vec<[f64; 2]> {
    line_string.coords().map(|c| [c.x, c.y]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn area(ring: &LineString) -> f64 {
        Polygon::new(ring.clone(), Vec::new()).unsigned_area()
    }

    #[test]
    fn test_simple_ring_unchanged() {
        let ring = line_string![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.), (x: 0., y: 10.), (x: 0., y: 0.)];
        assert!(is_simple(&ring));
        assert_eq!(repair(&ring).unwrap(), vec![ring]);
    }

    #[test]
    fn test_unclosed_ring_gets_closed() {
        let ring = line_string![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.)];
        let repaired = repair(&ring).unwrap();
        assert_eq!(
            repaired,
            vec![line_string![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.), (x: 0., y: 0.)]]
        );
    }

    #[test]
    fn test_bowtie_splits_into_two() {
        let bowtie = line_string![(x: 0., y: 0.), (x: 10., y: 10.), (x: 10., y: 0.), (x: 0., y: 10.), (x: 0., y: 0.)];
        assert!(!is_simple(&bowtie));

        let repaired = repair(&bowtie).unwrap();
        assert_eq!(2, repaired.len());
        for ring in &repaired {
            assert!(is_simple(ring));
            assert!((area(ring) - 25.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_spike_is_not_simple() {
        // The last vertex doubles back along the first edge
        let spike = line_string![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.), (x: 0., y: 10.), (x: 0., y: 0.), (x: 5., y: 0.), (x: 0., y: 0.)];
        assert!(!is_simple(&spike));

        let repaired = repair(&spike).unwrap();
        assert_eq!(1, repaired.len());
        assert!(is_simple(&repaired[0]));
        assert!((area(&repaired[0]) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_collinear_ring_has_no_area() {
        let flat = line_string![(x: 0., y: 0.), (x: 5., y: 0.), (x: 10., y: 0.), (x: 0., y: 0.)];
        assert!(repair(&flat).unwrap().is_empty());
    }

    #[test]
    fn test_impossible_rings() {
        let two_points = line_string![(x: 0., y: 0.), (x: 1., y: 1.), (x: 0., y: 0.), (x: 1., y: 1.)];
        assert!(matches!(
            repair(&two_points),
            Err(ClipError::GeometryRepairFailure(_))
        ));

        let infinite = line_string![(x: 0., y: 0.), (x: f64::INFINITY, y: 0.), (x: 1., y: 1.), (x: 0., y: 0.)];
        assert!(matches!(
            repair(&infinite),
            Err(ClipError::GeometryRepairFailure(_))
        ));
    }
}
