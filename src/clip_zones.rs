use anyhow::{Context, Result};
use geo::{Polygon, Rect};
use log::{info, warn};

use crate::{
    clip, repair, BoundingBox, BoundingBoxRequest, ClipConfig, ClipError, GeometryErrorPolicy,
    Zone,
};

/// Wherever zones are stored. This is the only place clipping waits on anything external.
pub trait ZoneSource {
    /// All zones for the year. An empty list means there are none.
    fn zones_for_year(&self, year: i32) -> Result<Vec<Zone>>;
}

/// Zones already in memory
impl ZoneSource for [Zone] {
    fn zones_for_year(&self, year: i32) -> Result<Vec<Zone>> {
        Ok(self.iter().filter(|z| z.year == year).cloned().collect())
    }
}

/// Fetches every zone for a year, unclipped. Having none at all is an error.
pub fn fetch_zones_for_year<S: ZoneSource + ?Sized>(
    source: &S,
    year: i32,
) -> Result<Vec<Zone>, ClipError> {
    let zones = source
        .zones_for_year(year)
        .with_context(|| format!("fetching zones for year {year}"))?;
    if zones.is_empty() {
        return Err(ClipError::NotFoundForYear(year));
    }
    info!("Retrieved {} zones for year {year}", zones.len());
    Ok(zones)
}

/// Clips every zone for the year to the viewport. Zones left with no geometry are omitted, so
/// this can succeed with an empty list. The input zones are never modified; each result carries
/// only the clipped polygons. Results are in the same order as the source returned them.
pub fn clip_zones_for_year<S: ZoneSource + ?Sized>(
    source: &S,
    year: i32,
    request: &BoundingBoxRequest,
    config: &ClipConfig,
) -> Result<Vec<Zone>, ClipError> {
    let bbox = BoundingBox::try_from(request).map_err(|err| {
        warn!("Invalid bounding box coordinates provided: {err}");
        err
    })?;
    let rect = bbox.to_rect();

    let zones = fetch_zones_for_year(source, year)?;
    let clipped = clip_all(&zones, &rect, config);
    info!(
        "{} of {} zones for year {year} overlap the viewport",
        clipped.len(),
        zones.len()
    );
    Ok(clipped)
}

#[cfg(not(feature = "parallel"))]
fn clip_all(zones: &[Zone], rect: &Rect, config: &ClipConfig) -> Vec<Zone> {
    zones
        .iter()
        .filter_map(|zone| clip_zone(zone, rect, config))
        .collect()
}

#[cfg(feature = "parallel")]
fn clip_all(zones: &[Zone], rect: &Rect, config: &ClipConfig) -> Vec<Zone> {
    use rayon::prelude::*;

    zones
        .par_iter()
        .filter_map(|zone| clip_zone(zone, rect, config))
        .collect()
}

/// Clips one zone, or returns None if nothing of it is left
pub fn clip_zone(zone: &Zone, rect: &Rect, config: &ClipConfig) -> Option<Zone> {
    let mut coords = Vec::new();
    for (idx, polygon) in zone.coords.iter().enumerate() {
        match clip_zone_polygon(polygon, rect) {
            Ok(pieces) => coords.extend(pieces),
            Err(err) => match config.on_geometry_error {
                GeometryErrorPolicy::DropPolygon => {
                    warn!("Skipping polygon {idx} of zone {}: {err}", zone.id);
                }
                GeometryErrorPolicy::DropZone => {
                    warn!("Skipping zone {}, polygon {idx} is broken: {err}", zone.id);
                    return None;
                }
            },
        }
    }
    if coords.is_empty() {
        return None;
    }
    Some(zone.with_coords(coords))
}

fn clip_zone_polygon(polygon: &Polygon, rect: &Rect) -> Result<Vec<Polygon>, ClipError> {
    let mut pieces = Vec::new();
    for ring in repair(polygon.exterior())? {
        pieces.extend(clip(&Polygon::new(ring, Vec::new()), rect));
    }
    Ok(pieces)
}
