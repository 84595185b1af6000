//! Configuration management for mirrorfield
//!
//! The file layer is plain data: every section deserializes with defaults for
//! the calibrated instrument, and is validated into the immutable core types
//! ([`CameraArray`](crate::CameraArray), [`OpticalModel`](crate::OpticalModel))
//! by their constructors.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::distortion::{CorrectionMode, OpticalModel, CALIBRATED_RADIUS_UM};
use crate::error::ConfigError;
use crate::normalize::{BoundingInterval, SamplingStrategy};
use crate::CameraId;

/// Physical layout of the camera array and the tile mosaic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraArrayConfig {
    /// Physical units (µm) per pixel along x, y, z
    #[serde(default = "default_resolution")]
    pub resolution: [f64; 3],

    /// Tile rows acquired by one camera before switching to the next
    #[serde(default = "default_rows_stacked")]
    pub rows_stacked_per_camera: usize,

    /// Tiles (columns) per mosaic row
    #[serde(default = "default_columns")]
    pub columns_per_camera_group: usize,

    /// Cameras in use, in acquisition order; reused cyclically
    #[serde(default = "default_active_cameras")]
    pub active_cameras: Vec<CameraId>,

    /// Number of physical cameras mounted in the array
    #[serde(default = "default_total_cameras")]
    pub total_camera_count: usize,

    /// Frame size in pixels
    #[serde(default = "default_frame_width")]
    pub frame_width_px: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height_px: u32,

    /// Strip width covered by one camera (µm), with overlap
    #[serde(default = "default_strip_width")]
    pub strip_width_um: f64,

    /// Strip width covered by one camera (µm), overlap removed
    #[serde(default = "default_strip_width_no_overlap")]
    pub strip_width_no_overlap_um: f64,
}

fn default_resolution() -> [f64; 3] {
    [0.157, 0.157, 1.0]
}

fn default_rows_stacked() -> usize {
    4
}

fn default_columns() -> usize {
    3
}

fn default_active_cameras() -> Vec<CameraId> {
    (1..=8).collect()
}

fn default_total_cameras() -> usize {
    10
}

fn default_frame_width() -> u32 {
    4096
}

fn default_frame_height() -> u32 {
    2560
}

fn default_strip_width() -> f64 {
    402.0
}

fn default_strip_width_no_overlap() -> f64 {
    328.0
}

impl Default for CameraArrayConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            rows_stacked_per_camera: default_rows_stacked(),
            columns_per_camera_group: default_columns(),
            active_cameras: default_active_cameras(),
            total_camera_count: default_total_cameras(),
            frame_width_px: default_frame_width(),
            frame_height_px: default_frame_height(),
            strip_width_um: default_strip_width(),
            strip_width_no_overlap_um: default_strip_width_no_overlap(),
        }
    }
}

/// Mirror curvature parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpticsConfig {
    /// Radius of curvature (µm)
    #[serde(default = "default_radius")]
    pub radius_um: f64,

    /// Index of the distorted (axial) coordinate; must be 2
    #[serde(default = "default_axis")]
    pub axis: usize,

    /// Whether the pipeline removes or simulates the distortion
    #[serde(default)]
    pub mode: CorrectionMode,
}

fn default_radius() -> f64 {
    CALIBRATED_RADIUS_UM
}

fn default_axis() -> usize {
    2
}

impl Default for OpticsConfig {
    fn default() -> Self {
        Self {
            radius_um: default_radius(),
            axis: default_axis(),
            mode: CorrectionMode::default(),
        }
    }
}

impl OpticsConfig {
    /// Validate into an [`OpticalModel`]
    pub fn model(&self) -> std::result::Result<OpticalModel, ConfigError> {
        OpticalModel::with_axis(self.radius_um, self.axis)
    }
}

/// Bounding interval of one tile, in pixel coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeConfig {
    #[serde(default = "default_volume_min")]
    pub min: Vec<f64>,
    #[serde(default = "default_volume_max")]
    pub max: Vec<f64>,
}

fn default_volume_min() -> Vec<f64> {
    vec![0.0, 0.0, 0.0]
}

fn default_volume_max() -> Vec<f64> {
    vec![4096.0, 2560.0, 3300.0]
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            min: default_volume_min(),
            max: default_volume_max(),
        }
    }
}

impl VolumeConfig {
    pub fn interval(&self) -> crate::Result<BoundingInterval> {
        BoundingInterval::new(self.min.clone(), self.max.clone())
    }
}

/// Which sampling strategy measures the normalization offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Corners,
    Middle,
}

impl StrategyKind {
    pub fn strategy(self) -> SamplingStrategy {
        match self {
            StrategyKind::Corners => SamplingStrategy::Corners,
            StrategyKind::Middle => SamplingStrategy::Middle,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NormalizationConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub camera_array: CameraArrayConfig,

    #[serde(default)]
    pub optics: OpticsConfig,

    #[serde(default)]
    pub volume: VolumeConfig,

    #[serde(default)]
    pub normalization: NormalizationConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

/// Parse a compact index list such as `"1-8"` or `"0,3,7-9"`.
///
/// Ranges are inclusive. Order is preserved and duplicates are kept, since
/// an active-camera list may legitimately revisit a camera.
pub fn parse_index_list(input: &str) -> std::result::Result<Vec<usize>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidIndexList {
        input: input.to_string(),
        reason,
    };
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|e| invalid(format!("{s:?}: {e}")))
    };

    let mut indices = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid("empty entry".to_string()));
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(invalid(format!("range {start}-{end} is reversed")));
                }
                indices.extend(start..=end);
            }
            None => indices.push(parse(part)?),
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.camera_array.active_cameras, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(config.camera_array.rows_stacked_per_camera, 4);
        assert_eq!(config.optics.axis, 2);
        assert_eq!(config.optics.mode, CorrectionMode::Remove);
        assert_eq!(config.volume.max, vec![4096.0, 2560.0, 3300.0]);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [camera_array]
            columns_per_camera_group = 13

            [optics]
            mode = "simulate"
            "#,
        )
        .unwrap();
        assert_eq!(config.camera_array.columns_per_camera_group, 13);
        assert_eq!(config.camera_array.total_camera_count, 10);
        assert_eq!(config.optics.mode, CorrectionMode::Simulate);
        assert_eq!(config.optics.radius_um, CALIBRATED_RADIUS_UM);
        assert_eq!(config.normalization.strategy, StrategyKind::Corners);
    }

    #[test]
    fn test_non_axial_distortion_axis_rejected() {
        let config: Config = toml::from_str(
            r#"
            [optics]
            axis = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.optics.model(), Err(ConfigError::InvalidAxis(0)));

        let model = Config::default().optics.model().unwrap();
        assert_eq!(model.axis(), 2);
        assert_eq!(model.radius(), CALIBRATED_RADIUS_UM);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mirrorfield.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let mut modified = created.clone();
        modified.camera_array.active_cameras = vec![2, 4];
        modified.normalization.strategy = StrategyKind::Middle;
        modified.save(&path).unwrap();

        let reloaded = Config::load_or_create(&path).unwrap();
        assert_eq!(reloaded, modified);
    }

    #[test]
    fn test_parse_index_list() {
        assert_eq!(parse_index_list("1-8").unwrap(), (1..=8).collect::<Vec<_>>());
        assert_eq!(parse_index_list("0, 3,7-9").unwrap(), vec![0, 3, 7, 8, 9]);
        assert_eq!(parse_index_list("5").unwrap(), vec![5]);
    }

    #[test]
    fn test_parse_index_list_rejects_garbage() {
        assert!(matches!(
            parse_index_list("8-1"),
            Err(ConfigError::InvalidIndexList { .. })
        ));
        assert!(parse_index_list("").is_err());
        assert!(parse_index_list("1,,2").is_err());
        assert!(parse_index_list("a-3").is_err());
    }
}
