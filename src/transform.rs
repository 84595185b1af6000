//! Invertible coordinate transforms
//!
//! A closed set of transform kinds: per-axis scale followed by translation,
//! the spherical-curvature axial warp, and ordered sequences of either.
//! Every kind has an exact inverse; only a zero scale makes inversion fail.

use nalgebra::{Point3, Vector3};

use crate::distortion::SphericalCurvature;
use crate::error::NumericError;

/// Anything that maps real 3D points to real 3D points.
pub trait RealTransform {
    fn apply(&self, point: &Point3<f64>) -> Point3<f64>;
}

/// `p ↦ p ⊙ scale + translation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTranslation {
    scale: Vector3<f64>,
    translation: Vector3<f64>,
}

impl ScaleTranslation {
    pub fn new(scale: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self { scale, translation }
    }

    /// Pure translation (unit scale)
    pub fn translation(translation: Vector3<f64>) -> Self {
        Self::new(Vector3::repeat(1.0), translation)
    }

    pub fn scale(&self) -> &Vector3<f64> {
        &self.scale
    }

    pub fn offset(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Exact algebraic inverse: `p ↦ (p − t) / s`, i.e. scale `1/s`, translation `−t/s`.
    pub fn inverse(&self) -> Result<Self, NumericError> {
        if let Some((axis, &value)) = self.scale.iter().enumerate().find(|(_, s)| **s == 0.0) {
            return Err(NumericError::SingularScale { axis, value });
        }
        let scale = self.scale.map(|s| 1.0 / s);
        let translation = -self.translation.component_mul(&scale);
        Ok(Self { scale, translation })
    }
}

impl RealTransform for ScaleTranslation {
    #[inline]
    fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(point.coords.component_mul(&self.scale) + self.translation)
    }
}

/// Ordered composition; the first member is applied first.
///
/// A `Sequence` is a value: [`Sequence::append`] returns a new sequence and
/// leaves the original untouched, so a base pipeline can be shared by
/// several tiles that each add their own normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    transforms: Vec<Transform>,
}

impl Sequence {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Self { transforms }
    }

    /// A new sequence with `transform` applied after every existing member
    #[must_use]
    pub fn append(&self, transform: Transform) -> Self {
        let mut transforms = Vec::with_capacity(self.transforms.len() + 1);
        transforms.extend(self.transforms.iter().cloned());
        transforms.push(transform);
        Self { transforms }
    }

    /// Members' inverses, in reverse order.
    pub fn inverse(&self) -> Result<Self, NumericError> {
        let transforms = self
            .transforms
            .iter()
            .rev()
            .map(Transform::inverse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { transforms })
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl RealTransform for Sequence {
    fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.transforms
            .iter()
            .fold(*point, |p, t| t.apply(&p))
    }
}

/// Any transform the correction core knows how to build and invert.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    ScaleTranslation(ScaleTranslation),
    SphericalCurvature(SphericalCurvature),
    Sequence(Sequence),
}

impl Transform {
    pub fn inverse(&self) -> Result<Transform, NumericError> {
        Ok(match self {
            Transform::ScaleTranslation(t) => Transform::ScaleTranslation(t.inverse()?),
            Transform::SphericalCurvature(d) => Transform::SphericalCurvature(d.inverse()),
            Transform::Sequence(s) => Transform::Sequence(s.inverse()?),
        })
    }
}

impl RealTransform for Transform {
    #[inline]
    fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        match self {
            Transform::ScaleTranslation(t) => t.apply(point),
            Transform::SphericalCurvature(d) => d.apply(point),
            Transform::Sequence(s) => s.apply(point),
        }
    }
}

impl From<ScaleTranslation> for Transform {
    fn from(t: ScaleTranslation) -> Self {
        Transform::ScaleTranslation(t)
    }
}

impl From<SphericalCurvature> for Transform {
    fn from(d: SphericalCurvature) -> Self {
        Transform::SphericalCurvature(d)
    }
}

impl From<Sequence> for Transform {
    fn from(s: Sequence) -> Self {
        Transform::Sequence(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &Point3<f64>, b: &Point3<f64>, tol: f64) {
        assert!(
            (a - b).norm() < tol,
            "points differ: {:?} vs {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_scale_translation_apply() {
        let t = ScaleTranslation::new(Vector3::new(2.0, 3.0, 0.5), Vector3::new(1.0, -1.0, 10.0));
        let p = t.apply(&Point3::new(1.0, 1.0, 4.0));
        assert_close(&p, &Point3::new(3.0, 2.0, 12.0), 1e-12);
    }

    #[test]
    fn test_scale_translation_roundtrip() {
        let t = ScaleTranslation::new(
            Vector3::new(0.157, 0.157, 1.0),
            Vector3::new(-321.536, 4793.0, 0.0),
        );
        let inv = t.inverse().unwrap();
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4096.0, 2560.0, 3300.0),
            Point3::new(-12.5, 700.25, 3.0),
        ] {
            assert_close(&inv.apply(&t.apply(&p)), &p, 1e-9);
            assert_close(&t.apply(&inv.apply(&p)), &p, 1e-9);
        }
    }

    #[test]
    fn test_double_inverse_is_identity() {
        let t = ScaleTranslation::new(Vector3::new(4.0, 0.25, 2.0), Vector3::new(3.0, -8.0, 1.5));
        let back = t.inverse().unwrap().inverse().unwrap();
        assert!((back.scale() - t.scale()).norm() < 1e-15);
        assert!((back.offset() - t.offset()).norm() < 1e-15);
    }

    #[test]
    fn test_zero_scale_is_not_invertible() {
        let t = ScaleTranslation::new(Vector3::new(1.0, 0.0, 1.0), Vector3::zeros());
        assert_eq!(
            t.inverse().unwrap_err(),
            NumericError::SingularScale { axis: 1, value: 0.0 }
        );

        let seq = Sequence::new(vec![ScaleTranslation::translation(Vector3::x()).into(), t.into()]);
        assert!(seq.inverse().is_err());
    }

    #[test]
    fn test_sequence_applies_in_list_order() {
        let scale = ScaleTranslation::new(Vector3::repeat(2.0), Vector3::zeros());
        let shift = ScaleTranslation::translation(Vector3::new(1.0, 0.0, 0.0));

        let scale_then_shift = Sequence::new(vec![scale.into(), shift.into()]);
        let shift_then_scale = Sequence::new(vec![shift.into(), scale.into()]);

        let p = Point3::new(1.0, 1.0, 1.0);
        assert_close(&scale_then_shift.apply(&p), &Point3::new(3.0, 2.0, 2.0), 1e-12);
        assert_close(&shift_then_scale.apply(&p), &Point3::new(4.0, 2.0, 2.0), 1e-12);
    }

    #[test]
    fn test_sequence_inverse_reverses_members() {
        let scale = ScaleTranslation::new(Vector3::new(2.0, 4.0, 8.0), Vector3::zeros());
        let shift = ScaleTranslation::translation(Vector3::new(1.0, 2.0, 3.0));
        let seq = Sequence::new(vec![scale.into(), shift.into()]);
        let inv = seq.inverse().unwrap();

        assert_eq!(inv.len(), 2);
        assert_eq!(inv.transforms()[0], Transform::from(shift.inverse().unwrap()));
        assert_eq!(inv.transforms()[1], Transform::from(scale.inverse().unwrap()));

        let p = Point3::new(5.0, -3.0, 0.5);
        assert_close(&inv.apply(&seq.apply(&p)), &p, 1e-12);
    }

    #[test]
    fn test_append_leaves_original_untouched() {
        let base = Sequence::new(vec![ScaleTranslation::translation(Vector3::x()).into()]);
        let a = base.append(ScaleTranslation::translation(Vector3::new(0.0, 0.0, 1.0)).into());
        let b = base.append(ScaleTranslation::translation(Vector3::new(0.0, 0.0, -1.0)).into());

        assert_eq!(base.len(), 1);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);

        let p = Point3::origin();
        assert_close(&base.apply(&p), &Point3::new(1.0, 0.0, 0.0), 1e-12);
        assert_close(&a.apply(&p), &Point3::new(1.0, 0.0, 1.0), 1e-12);
        assert_close(&b.apply(&p), &Point3::new(1.0, 0.0, -1.0), 1e-12);
    }

    #[test]
    fn test_empty_sequence_is_identity() {
        let seq = Sequence::default();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(seq.apply(&p), p);
        assert!(seq.inverse().unwrap().is_empty());
    }
}
