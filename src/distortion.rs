//! Axial distortion from spherical mirror curvature.
//!
//! A curved mirror images a flat specimen plane onto a spherical cap, so the
//! recorded depth of a point depends on its lateral distance from the optical
//! axis. With curvature radius `R` the axial displacement (sag) is
//!
//! ```text
//! sag(x, y) = R − sqrt(R² − x² − y²)
//! ```
//!
//! which is real only inside the cap, `x² + y² < R²`.
//!
//! # Convention
//!
//! - **forward** (ideal → imaged): `z_imaged = z + sag(x, y)`
//! - **inverse** (imaged → ideal): `z = z_imaged − sag(x, y)`
//!
//! Lateral coordinates pass through unchanged, so the inverse is exact.
//! [`CorrectionMode::Remove`] selects the inverse (correcting recorded
//! imagery); [`CorrectionMode::Simulate`] selects the forward model.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transform::{RealTransform, Transform};

/// Curvature radius estimated from calibration data (µm)
pub const CALIBRATED_RADIUS_UM: f64 = 34886.3436009136;

/// Which direction of the optical model a correction pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionMode {
    /// Remove distortion from recorded imagery (inverse model)
    #[default]
    Remove,
    /// Add distortion to undistorted imagery (forward model)
    Simulate,
}

/// Spherical-curvature warp of one axis, in either direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCurvature {
    radius: f64,
    axis: usize,
    inverted: bool,
}

impl SphericalCurvature {
    /// Axial displacement for a point; NaN outside the spherical cap.
    #[inline]
    pub fn sag(&self, point: &Point3<f64>) -> f64 {
        let r2: f64 = (0..3)
            .filter(|&d| d != self.axis)
            .map(|d| point[d] * point[d])
            .sum();
        self.radius - (self.radius * self.radius - r2).sqrt()
    }

    /// The same warp in the opposite direction
    pub fn inverse(&self) -> Self {
        Self {
            inverted: !self.inverted,
            ..*self
        }
    }

    /// `true` for the imaged → ideal direction
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn axis(&self) -> usize {
        self.axis
    }
}

impl RealTransform for SphericalCurvature {
    #[inline]
    fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        let sag = self.sag(point);
        let mut out = *point;
        if self.inverted {
            out[self.axis] -= sag;
        } else {
            out[self.axis] += sag;
        }
        out
    }
}

/// Optical model of the mirror: curvature radius and the warped axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticalModel {
    radius: f64,
    axis: usize,
}

impl OpticalModel {
    /// Model warping the axial (third) coordinate.
    pub fn new(radius: f64) -> Result<Self, ConfigError> {
        Self::with_axis(radius, 2)
    }

    /// Validate a radius and warped axis.
    ///
    /// Normalization measures and shifts the third coordinate, so only
    /// `axis == 2` is accepted.
    pub fn with_axis(radius: f64, axis: usize) -> Result<Self, ConfigError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::NonPositiveRadius(radius));
        }
        if axis != 2 {
            return Err(ConfigError::InvalidAxis(axis));
        }
        Ok(Self { radius, axis })
    }

    /// Model at the calibrated radius
    pub fn calibrated() -> Self {
        Self {
            radius: CALIBRATED_RADIUS_UM,
            axis: 2,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    /// The ideal → imaged warp as a transform value
    pub fn distortion(&self) -> SphericalCurvature {
        SphericalCurvature {
            radius: self.radius,
            axis: self.axis,
            inverted: false,
        }
    }

    /// Ideal → imaged
    pub fn forward(&self, point: &Point3<f64>) -> Point3<f64> {
        self.distortion().apply(point)
    }

    /// Imaged → ideal
    pub fn inverse(&self, point: &Point3<f64>) -> Point3<f64> {
        self.distortion().inverse().apply(point)
    }

    /// Whether a point lies inside the spherical cap, where the sag is defined
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.distortion().sag(point).is_finite()
    }

    /// The warp a correction pipeline should apply in physical space.
    pub fn correction_transform(&self, mode: CorrectionMode) -> Transform {
        let distortion = self.distortion();
        match mode {
            CorrectionMode::Remove => distortion.inverse().into(),
            CorrectionMode::Simulate => distortion.into(),
        }
    }
}

impl Default for OpticalModel {
    fn default() -> Self {
        Self::calibrated()
    }
}
