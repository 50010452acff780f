//! thirdeye-vision: the ThirdEye frame-to-detections pipeline
//!
//! Continuously captures camera frames, runs them through a pretrained
//! object-detection network, reduces the raw output to a clean set of
//! bounding boxes, annotates and re-encodes each frame, and publishes the
//! result to stream subscribers while exposing the most confident label to
//! a polling client.

pub mod annotate;
pub mod camera;
pub mod config;
pub mod encode;
pub mod error;
pub mod model;
pub mod postprocess;
pub mod publisher;
pub mod state;

pub use camera::Camera;
pub use config::{DetectionParams, VisionConfig};
pub use error::VisionError;
pub use model::{ModelAssets, YoloNetwork};
pub use postprocess::{BoundingBox, Detection, RawDetections, RawLayer};
pub use publisher::StreamPublisher;
pub use state::DetectionState;
