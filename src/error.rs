//! Validation errors for point records.

/// Errors raised while building points for the join.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatchmentError {
    /// Latitude outside [-90, 90], longitude outside [-180, 180], or either non-finite
    #[error("invalid coordinate for {name:?}: ({latitude}, {longitude})")]
    InvalidCoordinate {
        name: String,
        latitude: f64,
        longitude: f64,
    },

    /// Point name is blank
    #[error("point name must not be empty")]
    EmptyName,

    /// Region key is blank
    #[error("point {name:?} has no region")]
    EmptyRegion { name: String },
}

pub type Result<T> = std::result::Result<T, CatchmentError>;
