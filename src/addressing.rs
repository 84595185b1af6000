//! Tile addressing for the camera array
//!
//! Tiles are acquired in mosaic order: `columns_per_camera_group` tiles per
//! row, `rows_stacked_per_camera` rows per camera before the sweep moves on to
//! the next active camera. Cameras sit at fixed positions along y, one camera
//! field of view apart.

use nalgebra::{Point3, Vector3};
use serde::Serialize;
use tracing::debug;

use crate::config::CameraArrayConfig;
use crate::error::ConfigError;
use crate::{CameraId, TileId};

/// Validated, immutable camera array.
///
/// Built once per run from a [`CameraArrayConfig`]; every addressing and
/// camera-transform query is a pure function of it.
#[derive(Debug, Clone)]
pub struct CameraArray {
    resolution: Vector3<f64>,
    rows_stacked_per_camera: usize,
    columns_per_camera_group: usize,
    active_cameras: Vec<CameraId>,
    frame_width_px: u32,
    frame_height_px: u32,
    camera_fov: f64,
    total_fov: f64,
    x_positions: Vec<f64>,
    y_positions: Vec<f64>,
}

/// Everything the addressing function knows about one tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileAddress {
    pub tile: TileId,
    pub row: usize,
    pub column: usize,
    pub camera: CameraId,
    pub position: [f64; 3],
}

impl CameraArray {
    /// Validate a configuration and precompute the camera positions.
    pub fn new(config: &CameraArrayConfig) -> Result<Self, ConfigError> {
        for (axis, &value) in config.resolution.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveResolution { axis, value });
            }
        }
        let counts = [
            ("rows_stacked_per_camera", config.rows_stacked_per_camera),
            ("columns_per_camera_group", config.columns_per_camera_group),
            ("total_camera_count", config.total_camera_count),
            ("frame_width_px", config.frame_width_px as usize),
            ("frame_height_px", config.frame_height_px as usize),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ConfigError::ZeroCount { name, value });
            }
        }
        let lengths = [
            ("strip_width_um", config.strip_width_um),
            ("strip_width_no_overlap_um", config.strip_width_no_overlap_um),
        ];
        for (name, value) in lengths {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveLength { name, value });
            }
        }
        if config.active_cameras.is_empty() {
            return Err(ConfigError::NoActiveCameras);
        }
        if let Some(&camera) = config
            .active_cameras
            .iter()
            .find(|&&c| c >= config.total_camera_count)
        {
            return Err(ConfigError::CameraOutOfRange {
                camera,
                total: config.total_camera_count,
            });
        }

        let [rx, ry, rz] = config.resolution;
        let camera_fov = config.rows_stacked_per_camera as f64 * config.strip_width_no_overlap_um;
        let total_fov =
            (config.total_camera_count - 1) as f64 * camera_fov + config.strip_width_um;

        // Cameras share x; y steps down one camera FOV at a time from +TOTAL_FOV/2
        let x = -(config.frame_width_px as f64 / 2.0) * rx;
        let x_positions = vec![x; config.total_camera_count];
        let y_positions = (0..config.total_camera_count)
            .map(|i| total_fov / 2.0 - i as f64 * camera_fov)
            .collect();

        debug!(
            "Camera array: {} cameras, FOV {} um per camera, {} um total",
            config.total_camera_count, camera_fov, total_fov
        );

        Ok(Self {
            resolution: Vector3::new(rx, ry, rz),
            rows_stacked_per_camera: config.rows_stacked_per_camera,
            columns_per_camera_group: config.columns_per_camera_group,
            active_cameras: config.active_cameras.clone(),
            frame_width_px: config.frame_width_px,
            frame_height_px: config.frame_height_px,
            camera_fov,
            total_fov,
            x_positions,
            y_positions,
        })
    }

    /// Mosaic row of a tile
    pub fn row(&self, tile: TileId) -> usize {
        tile / self.columns_per_camera_group
    }

    /// Mosaic column of a tile
    pub fn column(&self, tile: TileId) -> usize {
        tile % self.columns_per_camera_group
    }

    /// Physical camera that acquired a tile.
    ///
    /// Rows are grouped `rows_stacked_per_camera` at a time; the group index
    /// selects an active camera, wrapping around when fewer cameras are
    /// active than there are groups.
    pub fn camera_id(&self, tile: TileId) -> CameraId {
        let group = (self.row(tile) / self.rows_stacked_per_camera) % self.columns_per_camera_group;
        self.active_cameras[group % self.active_cameras.len()]
    }

    /// World-space anchor of a camera (µm)
    pub fn position(&self, camera: CameraId) -> Result<Point3<f64>, ConfigError> {
        match (self.x_positions.get(camera), self.y_positions.get(camera)) {
            (Some(&x), Some(&y)) => Ok(Point3::new(x, y, 0.0)),
            _ => Err(ConfigError::CameraOutOfRange {
                camera,
                total: self.total_camera_count(),
            }),
        }
    }

    /// Full addressing report for one tile
    pub fn address(&self, tile: TileId) -> TileAddress {
        let camera = self.camera_id(tile);
        // Active cameras are range-checked at construction
        let position = [self.x_positions[camera], self.y_positions[camera], 0.0];
        TileAddress {
            tile,
            row: self.row(tile),
            column: self.column(tile),
            camera,
            position,
        }
    }

    /// Physical width covered by one camera's stack of rows
    pub fn camera_fov(&self) -> f64 {
        self.camera_fov
    }

    /// Physical width spanned by the whole array
    pub fn total_fov(&self) -> f64 {
        self.total_fov
    }

    pub fn resolution(&self) -> &Vector3<f64> {
        &self.resolution
    }

    pub fn active_cameras(&self) -> &[CameraId] {
        &self.active_cameras
    }

    pub fn total_camera_count(&self) -> usize {
        self.y_positions.len()
    }

    pub fn frame_size_px(&self) -> (u32, u32) {
        (self.frame_width_px, self.frame_height_px)
    }
}
