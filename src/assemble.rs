use geo::{Coord, Polygon};

use crate::geometry::close_ring;

/// Turns raw clipped contours into closed polygons. Consecutive duplicate points are collapsed,
/// and anything with fewer than 4 points after closing is dropped.
pub fn assemble(contours: Vec<Vec<Coord>>) -> Vec<Polygon> {
    contours
        .into_iter()
        .filter_map(|contour| {
            let mut pts: Vec<Coord> = Vec::with_capacity(contour.len() + 1);
            for pt in contour {
                if pts.last() != Some(&pt) {
                    pts.push(pt);
                }
            }
            let ring = close_ring(pts);
            if ring.0.len() < 4 {
                return None;
            }
            Some(Polygon::new(ring, Vec::new()))
        })
        .collect()
}
