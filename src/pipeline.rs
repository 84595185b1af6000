//! Per-tile distortion-correction pipelines
//!
//! The distortion is modeled in physical space, while tiles live in pixel
//! space, so every pipeline has the same shape:
//!
//! ```text
//! (pixel, distorted) → camera_to_image → (physical, distorted)
//!                    → correction      → (physical, corrected)
//!                    → image_to_camera → (pixel, corrected)
//! ```
//!
//! [`build_distortion_correction`] is the only way to obtain a
//! [`CorrectionPipeline`], so this order cannot be rearranged by callers.
//! Normalization appends one axial translation at the end.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::addressing::CameraArray;
use crate::distortion::{CorrectionMode, OpticalModel};
use crate::error::{Error, Result};
use crate::normalize::{add_normalization_offset, BoundingInterval, OffsetRange, SamplingStrategy};
use crate::transform::{RealTransform, ScaleTranslation, Sequence, Transform};
use crate::{CameraId, TileId};

/// Distortion correction for one tile, in tile pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionPipeline {
    tile: TileId,
    camera: CameraId,
    mode: CorrectionMode,
    sequence: Sequence,
    axial_offset: f64,
}

/// Build `camera_to_image → correction → image_to_camera` for a tile.
pub fn build_distortion_correction(
    tile: TileId,
    cameras: &CameraArray,
    model: &OpticalModel,
    mode: CorrectionMode,
) -> Result<CorrectionPipeline> {
    let camera = cameras.camera_id(tile);
    let context = |e: Error| e.at_tile(tile, Some(camera));

    let to_image = cameras
        .camera_to_image(camera)
        .map_err(|e| context(e.into()))?;
    let to_camera = cameras.image_to_camera(camera).map_err(context)?;

    debug!(
        "Tile {} -> camera {} at {:?}, radius {} um, {:?}",
        tile,
        camera,
        to_image.offset().as_slice(),
        model.radius(),
        mode
    );

    let sequence = Sequence::new(vec![
        to_image.into(),
        model.correction_transform(mode),
        to_camera.into(),
    ]);

    Ok(CorrectionPipeline {
        tile,
        camera,
        mode,
        sequence,
        axial_offset: 0.0,
    })
}

impl CorrectionPipeline {
    pub fn tile(&self) -> TileId {
        self.tile
    }

    pub fn camera(&self) -> CameraId {
        self.camera
    }

    pub fn mode(&self) -> CorrectionMode {
        self.mode
    }

    /// Total axial translation appended by normalization (pixel units)
    pub fn axial_offset(&self) -> f64 {
        self.axial_offset
    }

    pub fn is_normalized(&self) -> bool {
        self.sequence.len() > 3
    }

    /// The underlying transform sequence
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Hand the pipeline to a resampler or point evaluator
    pub fn to_transform(&self) -> Transform {
        self.sequence.clone().into()
    }

    /// Inverse of the whole pipeline (corrected → recorded coordinates)
    pub fn inverse(&self) -> Result<Sequence> {
        self.sequence
            .inverse()
            .map_err(|e| Error::from(e).at_tile(self.tile, Some(self.camera)))
    }

    /// A new pipeline with an axial translation appended; `self` is unchanged.
    pub(crate) fn with_axial_offset(&self, dz: f64) -> Self {
        let shift = ScaleTranslation::translation(Vector3::new(0.0, 0.0, dz));
        Self {
            sequence: self.sequence.append(shift.into()),
            axial_offset: self.axial_offset + dz,
            ..self.clone()
        }
    }
}

impl RealTransform for CorrectionPipeline {
    #[inline]
    fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.sequence.apply(point)
    }
}

/// A normalized pipeline with the offsets measured before and after.
#[derive(Debug, Clone)]
pub struct NormalizedCorrection {
    pub pipeline: CorrectionPipeline,
    pub before: OffsetRange,
    pub after: OffsetRange,
}

/// Serializable summary of a [`NormalizedCorrection`]
#[derive(Debug, Clone, Serialize)]
pub struct OffsetReport {
    pub tile: TileId,
    pub camera: CameraId,
    pub before: OffsetRange,
    pub offset: f64,
    pub after: OffsetRange,
}

impl NormalizedCorrection {
    pub fn report(&self) -> OffsetReport {
        OffsetReport {
            tile: self.pipeline.tile(),
            camera: self.pipeline.camera(),
            before: self.before,
            offset: self.pipeline.axial_offset(),
            after: self.after,
        }
    }
}

/// Build a tile's pipeline and center its axial displacement on zero.
pub fn build_normalized_correction(
    tile: TileId,
    cameras: &CameraArray,
    model: &OpticalModel,
    mode: CorrectionMode,
    interval: &BoundingInterval,
    strategy: SamplingStrategy,
) -> Result<NormalizedCorrection> {
    let pipeline = build_distortion_correction(tile, cameras, model, mode)?;
    let context = |e: Error| e.at_tile(tile, Some(pipeline.camera()));

    let before = strategy
        .min_max_offsets(&pipeline, interval)
        .map_err(context)?;
    let normalized = add_normalization_offset(&pipeline, before);
    let after = strategy
        .min_max_offsets(&normalized, interval)
        .map_err(context)?;

    info!(
        "Tile {} (camera {}): offsets [{:.4}, {:.4}] -> [{:.4}, {:.4}], normalization {:.4}",
        tile,
        normalized.camera(),
        before.min,
        before.max,
        after.min,
        after.max,
        normalized.axial_offset()
    );

    Ok(NormalizedCorrection {
        pipeline: normalized,
        before,
        after,
    })
}

/// [`build_normalized_correction`] for many tiles in parallel, in input order.
pub fn build_normalized_corrections(
    tiles: &[TileId],
    cameras: &CameraArray,
    model: &OpticalModel,
    mode: CorrectionMode,
    interval: &BoundingInterval,
    strategy: SamplingStrategy,
) -> Result<Vec<NormalizedCorrection>> {
    tiles
        .par_iter()
        .map(|&tile| build_normalized_correction(tile, cameras, model, mode, interval, strategy))
        .collect()
}
