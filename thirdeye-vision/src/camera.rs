//! USB webcam capture

use crate::config::VisionConfig;
use crate::error::VisionError;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use tracing::{info, warn};

/// Exclusive handle to one capture device.
///
/// Exactly one `Camera` backs a running pipeline; it is owned by the
/// publisher loop and never shared with stream subscribers.
pub struct Camera {
    capture: VideoCapture,
    camera_id: u32,
    released: bool,
}

impl Camera {
    /// Open the configured device and apply resolution and frame rate.
    pub fn open(config: &VisionConfig) -> Result<Self, VisionError> {
        let mut capture = VideoCapture::new(config.camera_id as i32, CAP_ANY).map_err(|e| {
            VisionError::Camera(format!("Failed to open camera {}: {}", config.camera_id, e))
        })?;

        if !capture.is_opened().map_err(|e| {
            VisionError::Camera(format!("Camera {} not opened: {}", config.camera_id, e))
        })? {
            return Err(VisionError::Camera(format!(
                "Camera {} failed to open",
                config.camera_id
            )));
        }

        capture
            .set(CAP_PROP_FRAME_WIDTH, config.resolution.0 as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set width: {}", e)))?;
        capture
            .set(CAP_PROP_FRAME_HEIGHT, config.resolution.1 as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set height: {}", e)))?;
        capture
            .set(CAP_PROP_FPS, config.frame_rate as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set FPS: {}", e)))?;

        info!(
            "Camera {} initialized at {}x{} @ {}fps",
            config.camera_id, config.resolution.0, config.resolution.1, config.frame_rate
        );

        Ok(Self {
            capture,
            camera_id: config.camera_id,
            released: false,
        })
    }

    /// Block until the device yields the next frame.
    pub fn capture(&mut self) -> Result<Mat, VisionError> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(|e| VisionError::Camera(format!("Failed to read frame: {}", e)))?;

        if !grabbed || frame.empty() {
            return Err(VisionError::Camera("Device returned no frame".to_string()));
        }

        Ok(frame)
    }

    /// Release the device handle. Safe to call more than once.
    pub fn close(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera {}: {}", self.camera_id, e);
        } else {
            info!("Camera {} released", self.camera_id);
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.close();
    }
}
