use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),
    #[error("no zones found for year {0}")]
    NotFoundForYear(i32),
    #[error("geometry repair failed: {0}")]
    GeometryRepairFailure(String),
    /// The zone source itself failed
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}
