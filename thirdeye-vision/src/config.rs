//! Configuration for thirdeye-vision

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Vision pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub camera_id: u32,
    /// Target frame rate (frames per second)
    pub frame_rate: u32,
    /// Camera resolution (width, height)
    pub resolution: (u32, u32),
    /// Directory holding the network config, weights and class-name files
    pub model_dir: PathBuf,
    /// Square side length of the network input blob
    pub input_size: u32,
    /// Minimum class score for a raw candidate to become a detection
    pub confidence_threshold: f32,
    /// IoU above which overlapping detections are suppressed
    pub nms_threshold: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            frame_rate: 30,
            resolution: (640, 480),
            model_dir: PathBuf::from("./models"),
            input_size: 416,
            confidence_threshold: 0.3,
            nms_threshold: 0.4,
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate == 0 || self.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        let total_pixels = self
            .resolution
            .0
            .checked_mul(self.resolution.1)
            .ok_or_else(|| "Resolution would cause integer overflow".to_string())?;

        if total_pixels > 100_000_000 {
            return Err("Resolution too large (max 100M pixels)".to_string());
        }

        if self.input_size == 0 || self.input_size > 2048 {
            return Err("Network input size must be between 1 and 2048".to_string());
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be within [0, 1]".to_string());
        }

        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err("NMS threshold must be within [0, 1]".to_string());
        }

        if self.camera_id > 100 {
            return Err("Camera ID too large (max 100)".to_string());
        }

        Ok(())
    }

    /// The slice of configuration the postprocessor needs.
    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            confidence_threshold: self.confidence_threshold,
            nms_threshold: self.nms_threshold,
        }
    }
}

/// Decode/suppression thresholds handed to the postprocessor
#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        VisionConfig::default().detection_params()
    }
}
