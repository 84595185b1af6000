//! Axial offset normalization
//!
//! Distortion correction shifts every tile in depth by an amount that depends
//! on the tile's lateral distance from the optical axis. To give adjacent
//! tiles a common axial reference, the net z-displacement of a pipeline is
//! sampled over the tile's bounding interval and a translation that centers
//! its range on zero is appended.
//!
//! # Sampling assumption
//!
//! [`min_max_offsets_corners`] only evaluates the 8 corners of the interval.
//! The spherical sag is independent of depth and monotone in lateral radius,
//! so the deepest point is always a corner. The shallowest point is a corner
//! only when the tile does not straddle the optical axis along x or y; a tile
//! that does (camera anchors center x on zero) has a slightly shallower
//! interior point, and the measured range is narrower than the true one.

use nalgebra::Point3;
use serde::Serialize;
use tracing::warn;

use crate::error::{DomainError, Error, NumericError, Result};
use crate::pipeline::CorrectionPipeline;
use crate::transform::RealTransform;

/// Axis-aligned bounding interval with at least one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingInterval {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl BoundingInterval {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        if min.len() != max.len() {
            return Err(DomainError::MismatchedBounds {
                min: min.len(),
                max: max.len(),
            }
            .into());
        }
        if let Some(axis) = (0..min.len()).find(|&d| !(min[d] <= max[d])) {
            return Err(DomainError::InvertedBounds {
                axis,
                min: min[axis],
                max: max[axis],
            }
            .into());
        }
        Ok(Self { min, max })
    }

    /// Interval `[0, extent[d]]` along every axis
    pub fn from_extent(extent: &[f64]) -> Result<Self> {
        Self::new(vec![0.0; extent.len()], extent.to_vec())
    }

    pub fn num_dimensions(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }

    fn require_3d(&self) -> Result<()> {
        if self.num_dimensions() < 3 {
            return Err(DomainError::TooFewDimensions(self.num_dimensions()).into());
        }
        Ok(())
    }

    /// The 2³ corners over the first three axes, x varying fastest.
    pub fn corners(&self) -> Result<[Point3<f64>; 8]> {
        self.require_3d()?;
        let mut corners = [Point3::origin(); 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            for d in 0..3 {
                corner[d] = if (i >> d) & 1 == 1 { self.max[d] } else { self.min[d] };
            }
        }
        Ok(corners)
    }

    /// Centroid over the first three axes
    pub fn middle(&self) -> Result<Point3<f64>> {
        self.require_3d()?;
        let mid = |d: usize| self.min[d] + (self.max[d] - self.min[d]) / 2.0;
        Ok(Point3::new(mid(0), mid(1), mid(2)))
    }
}

/// Extremes of the sampled axial displacement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OffsetRange {
    pub min: f64,
    pub max: f64,
}

impl OffsetRange {
    /// The offset that normalization removes
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// How the displacement of a pipeline is sampled over a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingStrategy {
    /// All 8 corners of the interval
    Corners,
    /// The interval's centroid only
    Middle,
    /// One caller-supplied point
    Point(Point3<f64>),
}

impl SamplingStrategy {
    pub fn min_max_offsets<T: RealTransform + ?Sized>(
        &self,
        transform: &T,
        interval: &BoundingInterval,
    ) -> Result<OffsetRange> {
        match self {
            SamplingStrategy::Corners => min_max_offsets_corners(transform, interval),
            SamplingStrategy::Middle => min_max_offsets_middle(transform, interval),
            SamplingStrategy::Point(p) => min_max_offsets_point(transform, p),
        }
    }
}

/// Net axial displacement of one point: `apply(p).z − p.z`
pub fn axial_displacement<T: RealTransform + ?Sized>(transform: &T, point: &Point3<f64>) -> Result<f64> {
    let dz = transform.apply(point).z - point.z;
    if !dz.is_finite() {
        warn!("Non-finite axial displacement at {:?}", point);
        return Err(Error::from(NumericError::NonFiniteDisplacement {
            x: point.x,
            y: point.y,
            z: point.z,
        }));
    }
    Ok(dz)
}

/// Min/max displacement over the 8 corners of `interval`.
pub fn min_max_offsets_corners<T: RealTransform + ?Sized>(
    transform: &T,
    interval: &BoundingInterval,
) -> Result<OffsetRange> {
    let mut range = OffsetRange {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };
    for corner in interval.corners()? {
        let dz = axial_displacement(transform, &corner)?;
        range.min = range.min.min(dz);
        range.max = range.max.max(dz);
    }
    Ok(range)
}

/// Displacement at the interval's centroid, as a degenerate range.
pub fn min_max_offsets_middle<T: RealTransform + ?Sized>(
    transform: &T,
    interval: &BoundingInterval,
) -> Result<OffsetRange> {
    min_max_offsets_point(transform, &interval.middle()?)
}

/// Displacement at one point, as a degenerate range.
pub fn min_max_offsets_point<T: RealTransform + ?Sized>(
    transform: &T,
    point: &Point3<f64>,
) -> Result<OffsetRange> {
    let dz = axial_displacement(transform, point)?;
    Ok(OffsetRange { min: dz, max: dz })
}

/// Append the translation `(0, 0, −midpoint)` that centers `range` on zero.
pub fn add_normalization_offset(pipeline: &CorrectionPipeline, range: OffsetRange) -> CorrectionPipeline {
    pipeline.with_axial_offset(-range.midpoint())
}
