//! Error types for the correction core
//!
//! Three families, kept apart so callers can tell a bad configuration from a
//! bad request or a degenerate computation:
//! - [`ConfigError`]: invalid instrument or optics parameters, rejected at construction
//! - [`DomainError`]: a request outside what an operation is defined for
//! - [`NumericError`]: a transform that cannot be inverted or evaluated

use thiserror::Error;

use crate::{CameraId, TileId};

/// Invalid camera-array or optics configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("resolution along axis {axis} must be positive and finite, got {value}")]
    NonPositiveResolution { axis: usize, value: f64 },

    #[error("{name} must be at least 1, got {value}")]
    ZeroCount { name: &'static str, value: usize },

    #[error("active camera list is empty")]
    NoActiveCameras,

    #[error("camera {camera} is outside the {total} physical cameras")]
    CameraOutOfRange { camera: CameraId, total: usize },

    #[error("{name} must be positive and finite, got {value}")]
    NonPositiveLength { name: &'static str, value: f64 },

    #[error("distortion radius must be positive and finite, got {0}")]
    NonPositiveRadius(f64),

    #[error("distorted axis must be 2 (z), got {0}")]
    InvalidAxis(usize),

    #[error("invalid index list {input:?}: {reason}")]
    InvalidIndexList { input: String, reason: String },
}

/// A request outside the domain of an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("interval must have at least 3 dimensions for axial offsets, got {0}")]
    TooFewDimensions(usize),

    #[error("interval bounds disagree in dimensionality: {min} min values, {max} max values")]
    MismatchedBounds { min: usize, max: usize },

    #[error("interval axis {axis} has min {min} greater than max {max}")]
    InvertedBounds { axis: usize, min: f64, max: f64 },

    #[error("sampling spacing along axis {axis} must be positive, got {value}")]
    NonPositiveSpacing { axis: usize, value: f64 },

    #[error("sampling lattice of {points} points exceeds the limit of {limit}")]
    LatticeTooLarge { points: f64, limit: usize },
}

/// A degenerate or non-evaluable transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    #[error("scale along axis {axis} is {value}; transform is not invertible")]
    SingularScale { axis: usize, value: f64 },

    #[error("axial displacement at ({x}, {y}, {z}) is not finite")]
    NonFiniteDisplacement { x: f64, y: f64, z: f64 },
}

/// Top-level error for the correction core.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error("tile {tile}{}", camera_suffix(.camera))]
    AtTile {
        tile: TileId,
        camera: Option<CameraId>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach tile/camera context to an error.
    pub fn at_tile(self, tile: TileId, camera: Option<CameraId>) -> Self {
        Error::AtTile {
            tile,
            camera,
            source: Box::new(self),
        }
    }

    /// The innermost error, with tile context stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::AtTile { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self.root(), Error::Config(_))
    }

    pub fn is_domain(&self) -> bool {
        matches!(self.root(), Error::Domain(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.root(), Error::Numeric(_))
    }
}

fn camera_suffix(camera: &Option<CameraId>) -> String {
    match camera {
        Some(c) => format!(" (camera {c})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
