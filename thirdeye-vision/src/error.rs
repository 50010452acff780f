//! Error types for thirdeye-vision

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Detection model not loaded")]
    ModelUnavailable,

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenCV error: {0}")]
    OpenCv(String),
}

impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Camera("Test error".to_string());
        assert!(err.to_string().contains("Camera error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        match vision_err {
            VisionError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_model_unavailable_display() {
        let err = VisionError::ModelUnavailable;
        assert!(err.to_string().contains("not loaded"));
    }

    #[test]
    fn test_all_error_variants() {
        let _ = VisionError::Camera("camera".to_string());
        let _ = VisionError::ModelUnavailable;
        let _ = VisionError::Inference("inference".to_string());
        let _ = VisionError::Decode("decode".to_string());
        let _ = VisionError::Encode("encode".to_string());
        let _ = VisionError::Config("config".to_string());
        let _ = VisionError::OpenCv("opencv".to_string());
    }
}
