mod assemble;
mod clip;
mod clip_zones;
mod config;
mod error;
mod geometry;
mod repair;
mod zone;

pub use self::assemble::assemble;
pub use self::clip::clip;
pub use self::clip_zones::{clip_zone, clip_zones_for_year, fetch_zones_for_year, ZoneSource};
pub use self::config::{ClipConfig, GeometryErrorPolicy};
pub use self::error::ClipError;
pub use self::geometry::{
    close_ring, is_closed_ring, linear_ring_text, open_coords, polygon_from_geojson,
    polygon_to_geojson, BoundingBox, BoundingBoxRequest, EPSILON,
};
pub use self::repair::{is_simple, repair};
pub use self::zone::{Zone, ZoneID};
