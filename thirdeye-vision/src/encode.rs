//! JPEG re-encoding of annotated frames

use crate::error::VisionError;
use bytes::Bytes;
use opencv::{
    core::{Mat, Vector},
    imgcodecs,
    prelude::*,
};

/// Serialize a frame as JPEG.
///
/// Fails only on malformed frame geometry; the pipeline skips delivery for
/// that cycle and keeps running.
pub fn encode_jpeg(frame: &Mat) -> Result<Bytes, VisionError> {
    if frame.empty() || frame.cols() <= 0 || frame.rows() <= 0 {
        return Err(VisionError::Encode(
            "Cannot encode frame with empty geometry".to_string(),
        ));
    }

    let mut buf = Vector::<u8>::new();
    let encoded = imgcodecs::imencode(".jpg", frame, &mut buf, &Vector::new())
        .map_err(|e| VisionError::Encode(format!("JPEG encoding failed: {}", e)))?;

    if !encoded {
        return Err(VisionError::Encode(
            "JPEG encoder rejected the frame".to_string(),
        ));
    }

    Ok(Bytes::from(buf.to_vec()))
}
