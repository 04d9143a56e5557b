use std::fmt;

use geo::Polygon;

/// Opaque; assigned by whatever stores zones.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ZoneID(pub String);

impl fmt::Display for ZoneID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, year-tagged region. Serialized with `coords` as a list of GeoJSON Polygon geometries.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zone {
    pub id: ZoneID,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    pub intensity: f64,
    /// RGB
    pub color: [u8; 3],
    pub year: i32,
    #[cfg_attr(feature = "serde", serde(with = "geojson_polygons"))]
    pub coords: Vec<Polygon>,
}

impl Zone {
    /// A copy of this zone with different geometry
    pub fn with_coords(&self, coords: Vec<Polygon>) -> Zone {
        Zone {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            intensity: self.intensity,
            color: self.color,
            year: self.year,
            coords,
        }
    }
}

#[cfg(feature = "serde")]
mod geojson_polygons {
    use geo::Polygon;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use crate::geometry::{polygon_from_geojson, polygon_to_geojson};

    pub fn serialize<S: Serializer>(polygons: &[Polygon], serializer: S) -> Result<S::Ok, S::Error> {
        let geometries: Vec<geojson::Geometry> = polygons.iter().map(polygon_to_geojson).collect();
        geometries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Polygon>, D::Error> {
        Vec::<geojson::Geometry>::deserialize(deserializer)?
            .into_iter()
            .map(|geometry| polygon_from_geojson(geometry).map_err(D::Error::custom))
            .collect()
    }
}
