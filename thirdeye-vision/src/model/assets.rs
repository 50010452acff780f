//! Model asset resolution
//!
//! The detection network is described by three files in a local directory:
//! topology config, trained weights, and the class-name list. Fetching them
//! is the job of an external provisioning step; this module only locates
//! them and tolerates their absence.

use crate::error::VisionError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const NETWORK_CONFIG_FILE: &str = "yolov3-openimages.cfg";
pub const NETWORK_WEIGHTS_FILE: &str = "yolov3-openimages.weights";
pub const CLASS_NAMES_FILE: &str = "openimages.names";

/// Paths of the three files the detector loads from.
#[derive(Debug, Clone)]
pub struct ModelAssets {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub names: PathBuf,
}

impl ModelAssets {
    /// Resolve the well-known file names against a model directory.
    pub fn resolve(model_dir: &Path) -> Self {
        Self {
            config: model_dir.join(NETWORK_CONFIG_FILE),
            weights: model_dir.join(NETWORK_WEIGHTS_FILE),
            names: model_dir.join(CLASS_NAMES_FILE),
        }
    }

    /// True when both network files exist; the detector cannot load without
    /// them.
    pub fn network_present(&self) -> bool {
        self.config.exists() && self.weights.exists()
    }

    /// File names that are currently missing from the model directory.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.config.exists() {
            missing.push(NETWORK_CONFIG_FILE);
        }
        if !self.weights.exists() {
            missing.push(NETWORK_WEIGHTS_FILE);
        }
        if !self.names.exists() {
            missing.push(CLASS_NAMES_FILE);
        }
        missing
    }

    /// Load class labels, one per line, trimmed, empty lines skipped.
    ///
    /// A missing names file is tolerated: detection then runs with no label
    /// table and every candidate is dropped at decode time.
    pub fn load_labels(&self) -> Result<Vec<String>, VisionError> {
        if !self.names.exists() {
            warn!("Class names file not found at {:?}", self.names);
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.names)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
