//! Error taxonomy for reverse geocoding.

use thiserror::Error;

/// Errors surfaced by the geocoder.
///
/// `Clone` so a single failed initialization can be reported to every waiting caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocError {
    #[error("invalid {field} '{value}': {reason}")]
    InvalidCoordinate {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("no valid place records to build the spatial index")]
    EmptyDataset,

    #[error("spatial index returned no match")]
    NoMatch,

    #[error("failed to load dataset: {0}")]
    Load(String),
}

impl GeolocError {
    /// Wrap a loader failure, keeping its full context chain
    pub fn load(err: &anyhow::Error) -> Self {
        GeolocError::Load(format!("{:#}", err))
    }
}

pub type Result<T, E = GeolocError> = std::result::Result<T, E>;
