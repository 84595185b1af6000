//! Per-camera pixel ↔ physical transforms
//!
//! Pixel coordinates of a tile are scaled by the resolution vector and
//! translated to the camera's fixed world-space anchor.

use crate::addressing::CameraArray;
use crate::error::{ConfigError, Error};
use crate::transform::ScaleTranslation;
use crate::CameraId;

impl CameraArray {
    /// Pixel → physical (µm) for one camera
    pub fn camera_to_image(&self, camera: CameraId) -> Result<ScaleTranslation, ConfigError> {
        let position = self.position(camera)?;
        Ok(ScaleTranslation::new(*self.resolution(), position.coords))
    }

    /// Physical (µm) → pixel for one camera, the exact inverse of [`Self::camera_to_image`]
    pub fn image_to_camera(&self, camera: CameraId) -> Result<ScaleTranslation, Error> {
        Ok(self.camera_to_image(camera)?.inverse()?)
    }
}
