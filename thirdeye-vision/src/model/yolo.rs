//! YOLO object detection network

use crate::error::VisionError;
use crate::model::ModelAssets;
use crate::postprocess::{RawDetections, RawLayer};
use opencv::{
    core::{self, Mat, Scalar, Size, Vector},
    dnn,
    prelude::*,
};
use tracing::{debug, info, warn};

/// The loaded detection network, or its "no inference" stand-in.
///
/// Loading happens once at startup. When the model files are absent or
/// unreadable the network stays unloaded and every `infer` call fails fast
/// with `ModelUnavailable`; the pipeline treats that as "no detections this
/// frame" rather than a fatal condition.
pub struct YoloNetwork {
    net: Option<dnn::Net>,
    labels: Vec<String>,
    input_size: i32,
}

impl YoloNetwork {
    /// Load the darknet config/weights pair and the class-name list.
    pub fn load(assets: &ModelAssets, input_size: u32) -> Self {
        let labels = assets.load_labels().unwrap_or_else(|e| {
            warn!("Failed to read class names: {}", e);
            Vec::new()
        });

        let net = if assets.network_present() {
            match Self::read_network(assets) {
                Ok(net) => {
                    info!(
                        "Detection model loaded from {:?} ({} classes)",
                        assets.weights,
                        labels.len()
                    );
                    Some(net)
                }
                Err(e) => {
                    warn!("Failed to load detection model: {}", e);
                    None
                }
            }
        } else {
            warn!(
                "Model files missing ({:?}), running without inference",
                assets.missing()
            );
            None
        };

        Self {
            net,
            labels,
            input_size: input_size as i32,
        }
    }

    fn read_network(assets: &ModelAssets) -> Result<dnn::Net, VisionError> {
        let config = assets.config.to_string_lossy();
        let weights = assets.weights.to_string_lossy();

        let mut net = dnn::read_net_from_darknet(&config, &weights)
            .map_err(|e| VisionError::Inference(format!("Failed to read network: {}", e)))?;
        net.set_preferable_backend(dnn::DNN_BACKEND_OPENCV)
            .map_err(|e| VisionError::Inference(format!("Failed to set backend: {}", e)))?;
        net.set_preferable_target(dnn::DNN_TARGET_CPU)
            .map_err(|e| VisionError::Inference(format!("Failed to set target: {}", e)))?;

        Ok(net)
    }

    /// Whether a network is loaded and `infer` can run.
    pub fn is_loaded(&self) -> bool {
        self.net.is_some()
    }

    /// Class-name table, indexed by class id.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run one forward pass and extract the raw per-layer output.
    ///
    /// Preprocessing matches the network's training regime: resize to the
    /// square input, scale pixel values by 1/255, swap BGR to RGB, no crop.
    pub fn infer(&mut self, frame: &Mat) -> Result<RawDetections, VisionError> {
        let net = self.net.as_mut().ok_or(VisionError::ModelUnavailable)?;

        let blob = dnn::blob_from_image(
            frame,
            1.0 / 255.0,
            Size::new(self.input_size, self.input_size),
            Scalar::default(),
            true,
            false,
            core::CV_32F,
        )
        .map_err(|e| VisionError::Inference(format!("Failed to build input blob: {}", e)))?;

        net.set_input(&blob, "", 1.0, Scalar::default())
            .map_err(|e| VisionError::Inference(format!("Failed to set network input: {}", e)))?;

        let out_names = net
            .get_unconnected_out_layers_names()
            .map_err(|e| VisionError::Inference(format!("Failed to list output layers: {}", e)))?;

        let mut outputs = Vector::<Mat>::new();
        net.forward(&mut outputs, &out_names)
            .map_err(|e| VisionError::Inference(format!("Forward pass failed: {}", e)))?;

        let mut layers = Vec::with_capacity(outputs.len());
        for out in outputs.iter() {
            let rows = out.rows().max(0) as usize;
            let cols = out.cols().max(0) as usize;
            let data = out
                .data_typed::<f32>()
                .map_err(|e| VisionError::Inference(format!("Failed to read output: {}", e)))?
                .to_vec();
            layers.push(RawLayer { rows, cols, data });
        }

        debug!("Inference produced {} output layers", layers.len());
        Ok(RawDetections { layers })
    }
}

#[cfg(test)]
mod tests {
    use super::super::assets::{NETWORK_CONFIG_FILE, NETWORK_WEIGHTS_FILE};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_assets_loads_in_no_inference_mode() {
        let dir = TempDir::new().unwrap();
        let assets = ModelAssets::resolve(dir.path());

        let network = YoloNetwork::load(&assets, 416);
        assert!(!network.is_loaded());
        assert!(network.labels().is_empty());
    }

    #[test]
    fn test_unloaded_network_fails_fast() {
        let dir = TempDir::new().unwrap();
        let assets = ModelAssets::resolve(dir.path());

        let mut network = YoloNetwork::load(&assets, 416);
        let frame = Mat::default();
        assert!(matches!(
            network.infer(&frame),
            Err(VisionError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_garbage_network_files_are_tolerated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(NETWORK_CONFIG_FILE), "not a config").unwrap();
        std::fs::write(dir.path().join(NETWORK_WEIGHTS_FILE), "not weights").unwrap();

        let assets = ModelAssets::resolve(dir.path());
        let network = YoloNetwork::load(&assets, 416);
        assert!(!network.is_loaded());
    }
}
