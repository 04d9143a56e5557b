use anyhow::Result;
use geo::{coord, Coord, LineString, Polygon, Rect};
use log::debug;

use crate::ClipError;

/// Tolerance for every intersection and boundary test. Ring closure is always checked exactly.
pub const EPSILON: f64 = 1e-9;

/// True if the ring has at least 4 points and repeats its first point at the end.
pub fn is_closed_ring(ring: &LineString) -> bool {
    ring.0.len() >= 4 && ring.0.first() == ring.0.last()
}

/// Appends the first point to the end, unless it's already there.
pub fn close_ring(mut pts: Vec<Coord>) -> LineString {
    if let (Some(first), Some(last)) = (pts.first(), pts.last()) {
        if first != last {
            pts.push(*first);
        }
    }
    LineString::new(pts)
}

/// The distinct vertices of a ring, in order. The closing point and consecutive duplicates are
/// removed.
pub fn open_coords(ring: &LineString) -> Vec<Coord> {
    let mut pts: Vec<Coord> = Vec::with_capacity(ring.0.len());
    for pt in ring.coords() {
        if pts.last() != Some(pt) {
            pts.push(*pt);
        }
    }
    while pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

/// Describes a ring as `LINEARRING (x y, x y, ...)`, explicitly closed.
pub fn linear_ring_text(ring: &LineString) -> String {
    let mut pts = open_coords(ring);
    if let Some(first) = pts.first().copied() {
        pts.push(first);
    }
    let pairs: Vec<String> = pts.iter().map(|pt| format!("{} {}", pt.x, pt.y)).collect();
    format!("LINEARRING ({})", pairs.join(", "))
}

pub fn polygon_to_geojson(polygon: &Polygon) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(polygon))
}

/// Only the exterior ring is kept; holes aren't modelled.
pub fn polygon_from_geojson(geometry: geojson::Geometry) -> Result<Polygon> {
    let polygon: geo_types::Polygon<f64> = geo_types::Polygon::try_from(geometry.value)?;
    if !polygon.interiors().is_empty() {
        debug!(
            "Dropping {} interior rings from a zone polygon",
            polygon.interiors().len()
        );
    }
    let (exterior, _) = polygon.into_inner();
    Ok(Polygon::new(exterior, Vec::new()))
}

/// The viewport as received on the wire. Either corner may be missing or malformed.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBoxRequest {
    #[cfg_attr(feature = "serde", serde(rename = "leftTopPointLatLon", default))]
    pub left_top: Option<Vec<f64>>,
    #[cfg_attr(feature = "serde", serde(rename = "rightBottomPointLatLon", default))]
    pub right_bottom: Option<Vec<f64>>,
}

impl BoundingBoxRequest {
    pub fn new(left_top: [f64; 2], right_bottom: [f64; 2]) -> Self {
        Self {
            left_top: Some(left_top.to_vec()),
            right_bottom: Some(right_bottom.to_vec()),
        }
    }
}

/// A validated viewport. No ordering is enforced between the two corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub left_top: Coord,
    pub right_bottom: Coord,
}

impl TryFrom<&BoundingBoxRequest> for BoundingBox {
    type Error = ClipError;

    fn try_from(req: &BoundingBoxRequest) -> Result<Self, ClipError> {
        Ok(Self {
            left_top: corner("leftTopPointLatLon", req.left_top.as_deref())?,
            right_bottom: corner("rightBottomPointLatLon", req.right_bottom.as_deref())?,
        })
    }
}

fn corner(name: &str, values: Option<&[f64]>) -> Result<Coord, ClipError> {
    match values {
        None => Err(ClipError::InvalidBoundingBox(format!("{name} is missing"))),
        Some([x, y]) if x.is_finite() && y.is_finite() => Ok(coord! { x: *x, y: *y }),
        Some([_, _]) => Err(ClipError::InvalidBoundingBox(format!(
            "{name} has a non-finite coordinate"
        ))),
        Some(other) => Err(ClipError::InvalidBoundingBox(format!(
            "{name} has {} coordinates, expected 2",
            other.len()
        ))),
    }
}

impl BoundingBox {
    /// `(x1,y1),(x1,y2),(x2,y2),(x2,y1),(x1,y1)`
    pub fn to_ring(&self) -> LineString {
        let (x1, y1) = self.left_top.x_y();
        let (x2, y2) = self.right_bottom.x_y();
        LineString::from(vec![(x1, y1), (x1, y2), (x2, y2), (x2, y1), (x1, y1)])
    }

    /// Normalizes the corners, so an inverted box covers the same area.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left_top, self.right_bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    #[test]
    fn test_open_and_close() {
        let ring = line_string![(x: 0., y: 0.), (x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 0.)];
        let pts = open_coords(&ring);
        assert_eq!(pts.len(), 3);
        let closed = close_ring(pts);
        assert!(is_closed_ring(&closed));
        assert_eq!(
            closed,
            line_string![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 0.)]
        );

        assert!(!is_closed_ring(&line_string![(x: 0., y: 0.), (x: 1., y: 0.), (x: 0., y: 0.)]));
        assert!(!is_closed_ring(
            &line_string![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 1.)]
        ));
    }

    #[test]
    fn test_linear_ring_text() {
        let unclosed = line_string![(x: 0., y: 0.), (x: 0., y: 10.), (x: 10.5, y: 10.)];
        assert_eq!(
            linear_ring_text(&unclosed),
            "LINEARRING (0 0, 0 10, 10.5 10, 0 0)"
        );
    }

    #[test]
    fn test_bounding_box_ring() {
        let bbox = BoundingBox::try_from(&BoundingBoxRequest::new([5., 5.], [15., -5.])).unwrap();
        assert_eq!(
            bbox.to_ring(),
            line_string![(x: 5., y: 5.), (x: 5., y: -5.), (x: 15., y: -5.), (x: 15., y: 5.), (x: 5., y: 5.)]
        );
        let rect = bbox.to_rect();
        assert_eq!(rect.min(), coord! { x: 5., y: -5. });
        assert_eq!(rect.max(), coord! { x: 15., y: 5. });
    }

    #[test]
    fn test_invalid_bounding_box() {
        let missing = BoundingBoxRequest {
            left_top: None,
            right_bottom: Some(vec![1., 2.]),
        };
        let too_long = BoundingBoxRequest {
            left_top: Some(vec![1., 2., 3.]),
            right_bottom: Some(vec![1., 2.]),
        };
        let nan = BoundingBoxRequest::new([f64::NAN, 0.], [1., 1.]);
        for req in [missing, too_long, nan] {
            assert!(matches!(
                BoundingBox::try_from(&req),
                Err(ClipError::InvalidBoundingBox(_))
            ));
        }
    }

    #[test]
    fn test_geojson_interop() {
        let polygon = polygon![(x: 0., y: 0.), (x: 4., y: 0.), (x: 4., y: 4.), (x: 0., y: 0.)];
        let geometry = polygon_to_geojson(&polygon);
        assert!(matches!(geometry.value, geojson::Value::Polygon(_)));
        assert_eq!(polygon_from_geojson(geometry).unwrap(), polygon);
    }
}
