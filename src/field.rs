//! Axial displacement fields
//!
//! Samples `apply(p).z − p.z` on a regular lattice over a tile, for
//! inspecting how a correction pipeline moves depth across the field of
//! view. Slices along z are evaluated in parallel.

use nalgebra::Point3;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{DomainError, Result};
use crate::normalize::{axial_displacement, BoundingInterval};
use crate::transform::RealTransform;

/// Largest lattice [`DisplacementField::sample`] will allocate
pub const MAX_LATTICE_POINTS: usize = 1 << 26;

/// Displacements on a lattice, x varying fastest.
#[derive(Debug, Clone)]
pub struct DisplacementField {
    shape: [usize; 3],
    origin: [f64; 3],
    extent: [f64; 3],
    spacing: [f64; 3],
    values: Vec<f64>,
}

/// Lattice coordinates along one axis: `min, min + step, …`, always ending at `max`.
fn axis_samples(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut samples = Vec::new();
    let mut k = 0usize;
    loop {
        let v = min + k as f64 * step;
        if v >= max {
            break;
        }
        samples.push(v);
        k += 1;
    }
    samples.push(max);
    samples
}

impl DisplacementField {
    /// Sample `transform` every `spacing[d]` units over the first three axes of `interval`.
    pub fn sample<T: RealTransform + Sync + ?Sized>(
        transform: &T,
        interval: &BoundingInterval,
        spacing: [f64; 3],
    ) -> Result<Self> {
        if interval.num_dimensions() < 3 {
            return Err(DomainError::TooFewDimensions(interval.num_dimensions()).into());
        }
        if let Some(axis) = (0..3).find(|&d| !(spacing[d] > 0.0 && spacing[d].is_finite())) {
            return Err(DomainError::NonPositiveSpacing {
                axis,
                value: spacing[axis],
            }
            .into());
        }

        // Upper bound on axis_samples' length, checked before anything is allocated
        let points: f64 = (0..3)
            .map(|d| ((interval.max()[d] - interval.min()[d]) / spacing[d]).floor() + 2.0)
            .product();
        if !(points <= MAX_LATTICE_POINTS as f64) {
            return Err(DomainError::LatticeTooLarge {
                points,
                limit: MAX_LATTICE_POINTS,
            }
            .into());
        }

        let axes: Vec<Vec<f64>> = (0..3)
            .map(|d| axis_samples(interval.min()[d], interval.max()[d], spacing[d]))
            .collect();
        let shape = [axes[0].len(), axes[1].len(), axes[2].len()];
        debug!("Sampling displacement field on a {:?} lattice", shape);

        let slices = axes[2]
            .par_iter()
            .map(|&z| {
                let mut slice = Vec::with_capacity(shape[0] * shape[1]);
                for &y in &axes[1] {
                    for &x in &axes[0] {
                        slice.push(axial_displacement(transform, &Point3::new(x, y, z))?);
                    }
                }
                Ok::<_, crate::Error>(slice)
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        Ok(Self {
            shape,
            origin: [interval.min()[0], interval.min()[1], interval.min()[2]],
            extent: [interval.max()[0], interval.max()[1], interval.max()[2]],
            spacing,
            values: slices.concat(),
        })
    }

    /// Lattice size along x, y, z
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Displacement at lattice index `(i, j, k)`
    pub fn value_at(&self, i: usize, j: usize, k: usize) -> Option<f64> {
        let [nx, ny, nz] = self.shape;
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        self.values.get(i + nx * (j + ny * k)).copied()
    }

    /// Lattice point for index `(i, j, k)`, clamped to the interval max
    pub fn position_of(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        let at = |d: usize, n: usize| (self.origin[d] + n as f64 * self.spacing[d]).min(self.extent[d]);
        Point3::new(at(0, i), at(1, j), at(2, k))
    }

    pub fn stats(&self) -> Option<Stats> {
        Stats::compute(&self.values)
    }
}

/// Five-number summary plus mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Stats {
    /// `None` for empty input
    pub fn compute(data: &[f64]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let mut sorted = data.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;

        Some(Self {
            count,
            mean,
            min: sorted[0],
            q1: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            q3: percentile(&sorted, 75.0),
            max: sorted[count - 1],
        })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Count:   {}", self.count)?;
        writeln!(f, "Average: {:.4}", self.mean)?;
        writeln!(f, "Min:     {:.4}", self.min)?;
        writeln!(f, "Q1:      {:.4}", self.q1)?;
        writeln!(f, "Median:  {:.4}", self.median)?;
        writeln!(f, "Q3:      {:.4}", self.q3)?;
        writeln!(f, "Max:     {:.4}", self.max)?;
        writeln!(f, "Range:   {:.4}", self.range())?;
        write!(f, "IQR:     {:.4}", self.iqr())
    }
}

/// Linearly interpolated percentile of sorted, non-empty data
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let index = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}
