//! mirrorfield - axial distortion correction for a multi-camera mirror microscope
//!
//! Every tile of a mosaic is acquired by one camera of a linear array
//! looking through a curved mirror. The mirror bends the focal plane onto a
//! spherical cap, so recorded depth drifts with lateral distance from the
//! optical axis. This crate builds, per tile, the coordinate transform that
//! undoes that drift in the tile's own pixel space:
//!
//! - [`addressing`]: tile index → mosaic row/column → camera → camera anchor
//! - [`camera`]: pixel ↔ physical scale-translation for a camera
//! - [`distortion`]: the spherical-curvature model and its inverse
//! - [`pipeline`]: composition into one per-tile correction
//! - [`normalize`]: centering each tile's axial displacement on zero
//! - [`field`]: dense displacement sampling for inspection
//!
//! ```no_run
//! use mirrorfield::{
//!     build_normalized_correction, BoundingInterval, CameraArray, CameraArrayConfig,
//!     CorrectionMode, OpticalModel, SamplingStrategy,
//! };
//!
//! # fn main() -> mirrorfield::Result<()> {
//! let cameras = CameraArray::new(&CameraArrayConfig::default())?;
//! let model = OpticalModel::calibrated();
//! let tile = BoundingInterval::from_extent(&[4096.0, 2560.0, 3300.0])?;
//! let corrected = build_normalized_correction(
//!     0,
//!     &cameras,
//!     &model,
//!     CorrectionMode::Remove,
//!     &tile,
//!     SamplingStrategy::Corners,
//! )?;
//! println!("{:?}", corrected.report());
//! # Ok(())
//! # }
//! ```

pub mod addressing;
pub mod camera;
pub mod config;
pub mod distortion;
pub mod error;
pub mod field;
pub mod normalize;
pub mod pipeline;
pub mod transform;

/// Sequential index of a tile in acquisition order
pub type TileId = usize;

/// Index of a physical camera in the array
pub type CameraId = usize;

pub use addressing::{CameraArray, TileAddress};
pub use config::{parse_index_list, CameraArrayConfig, Config, StrategyKind};
pub use distortion::{CorrectionMode, OpticalModel, SphericalCurvature, CALIBRATED_RADIUS_UM};
pub use error::{ConfigError, DomainError, Error, NumericError, Result};
pub use field::{DisplacementField, Stats, MAX_LATTICE_POINTS};
pub use normalize::{
    add_normalization_offset, axial_displacement, min_max_offsets_corners, min_max_offsets_middle,
    min_max_offsets_point, BoundingInterval, OffsetRange, SamplingStrategy,
};
pub use pipeline::{
    build_distortion_correction, build_normalized_correction, build_normalized_corrections,
    CorrectionPipeline, NormalizedCorrection, OffsetReport,
};
pub use transform::{RealTransform, ScaleTranslation, Sequence, Transform};
