/// What to do when one polygon of a zone can't be turned into valid geometry. Other zones are
/// never affected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum GeometryErrorPolicy {
    /// Skip the bad polygon and keep the rest of the zone
    #[default]
    DropPolygon,
    /// Leave the whole zone out of the result
    DropZone,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ClipConfig {
    pub on_geometry_error: GeometryErrorPolicy,
}
