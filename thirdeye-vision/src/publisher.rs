//! Continuous capture → detect → publish loop
//!
//! One dedicated task owns the camera and the loaded network and runs the
//! full cycle regardless of how many stream consumers are attached. Encoded
//! frames fan out over a bounded broadcast channel: a slow subscriber skips
//! frames instead of blocking the capture cycle.

use crate::annotate::annotate;
use crate::camera::Camera;
use crate::config::{DetectionParams, VisionConfig};
use crate::encode::encode_jpeg;
use crate::error::VisionError;
use crate::model::YoloNetwork;
use crate::postprocess::{self, Detection};
use crate::state::DetectionState;
use bytes::Bytes;
use opencv::core::Mat;
use opencv::prelude::*;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Broadcast ring size. A lagging subscriber loses the oldest frames and
/// resumes from the newest one.
const FRAME_CHANNEL_CAPACITY: usize = 4;

/// Consecutive capture failures after which the loop terminates.
const MAX_CAPTURE_FAILURES: u32 = 10;

/// Handle to the running pipeline.
pub struct StreamPublisher {
    frames_tx: broadcast::Sender<Bytes>,
    detections: DetectionState,
    is_running: Arc<RwLock<bool>>,
    handle: RwLock<Option<JoinHandle<()>>>,
}

impl StreamPublisher {
    /// Take ownership of the camera and network and start the cycle.
    pub fn start(
        camera: Camera,
        network: YoloNetwork,
        detections: DetectionState,
        config: VisionConfig,
    ) -> Self {
        let (frames_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let is_running = Arc::new(RwLock::new(true));

        let handle = tokio::spawn(run_pipeline(
            camera,
            network,
            detections.clone(),
            config,
            frames_tx.clone(),
            is_running.clone(),
        ));

        Self {
            frames_tx,
            detections,
            is_running,
            handle: RwLock::new(Some(handle)),
        }
    }

    /// Attach a stream consumer at the current point of the cycle. No
    /// replay of earlier frames.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.frames_tx.subscribe()
    }

    /// The fan-out sender, for transport layers that manage their own
    /// subscriptions.
    pub fn frame_sender(&self) -> broadcast::Sender<Bytes> {
        self.frames_tx.clone()
    }

    /// Handle to the shared current-detection label.
    pub fn detections(&self) -> DetectionState {
        self.detections.clone()
    }

    /// Whether the pipeline task is still cycling.
    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    /// Stop the cycle and release camera and network deterministically.
    pub async fn stop(&self) {
        {
            let mut is_running = self.is_running.write();
            if !*is_running {
                return;
            }
            *is_running = false;
        }

        let handle = self.handle.write().take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(Duration::from_secs(2), &mut handle)
                .await
                .is_err()
            {
                warn!("Pipeline task did not stop in time, aborting");
                handle.abort();
                let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
            }
        }

        info!("Stream publisher stopped");
    }
}

async fn run_pipeline(
    mut camera: Camera,
    mut network: YoloNetwork,
    detections: DetectionState,
    config: VisionConfig,
    frames_tx: broadcast::Sender<Bytes>,
    is_running: Arc<RwLock<bool>>,
) {
    let params = config.detection_params();
    let frame_rate = if config.frame_rate == 0 { 1 } else { config.frame_rate };
    let frame_interval = Duration::from_secs_f64(1.0 / frame_rate as f64);
    let mut capture_failures: u32 = 0;

    info!("Stream publisher started");

    loop {
        if !*is_running.read() {
            break;
        }

        let cycle_start = Instant::now();

        let frame = match camera.capture() {
            Ok(frame) => {
                capture_failures = 0;
                frame
            }
            Err(e) => {
                capture_failures += 1;
                if capture_failures >= MAX_CAPTURE_FAILURES {
                    error!(
                        "Too many camera read errors ({}), stopping stream: {}",
                        capture_failures, e
                    );
                    break;
                }

                warn!("Camera read error ({}): {}", capture_failures, e);
                let backoff_ms = (100u64 * (1u64 << capture_failures.min(5))).min(5000);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                continue;
            }
        };

        let kept = detect_frame(&mut network, &frame, &params);
        detections.set(postprocess::best_label(&kept));

        // A cycle with nothing kept still streams the raw frame.
        let annotated = if kept.is_empty() {
            None
        } else {
            match annotate(&frame, &kept) {
                Ok(canvas) => Some(canvas),
                Err(e) => {
                    warn!("Annotation failed, streaming raw frame: {}", e);
                    None
                }
            }
        };

        match encode_jpeg(annotated.as_ref().unwrap_or(&frame)) {
            Ok(encoded) => {
                // An Err here only means nobody is subscribed right now.
                let _ = frames_tx.send(encoded);
            }
            Err(e) => warn!("Skipping delivery for this cycle: {}", e),
        }

        let elapsed = cycle_start.elapsed();
        if elapsed < frame_interval {
            tokio::time::sleep(frame_interval - elapsed).await;
        }
    }

    detections.clear();
    camera.close();
    *is_running.write() = false;
    info!("Pipeline loop exited");
}

/// One inference + reduction pass. Every failure degrades to "no
/// detections this frame" so the stream keeps flowing.
fn detect_frame(network: &mut YoloNetwork, frame: &Mat, params: &DetectionParams) -> Vec<Detection> {
    let raw = match network.infer(frame) {
        Ok(raw) => raw,
        Err(VisionError::ModelUnavailable) => {
            debug!("Model unavailable, streaming unannotated frames");
            return Vec::new();
        }
        Err(e) => {
            warn!("Inference failed: {}", e);
            return Vec::new();
        }
    };

    let width = frame.cols().max(0) as u32;
    let height = frame.rows().max(0) as u32;

    match postprocess::decode_detections(&raw, width, height, network.labels(), params) {
        Ok(candidates) => postprocess::non_max_suppression(candidates, params.nms_threshold),
        Err(e) => {
            warn!("Discarding malformed network output: {}", e);
            Vec::new()
        }
    }
}
