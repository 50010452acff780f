// HTTP server with routes for the live stream and the detection poller

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Response},
    response::Json,
    routing::get,
    Router,
};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use thirdeye_vision::DetectionState;
use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Multipart boundary token, fixed for the lifetime of a stream response.
pub const STREAM_BOUNDARY: &str = "frame";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Fan-out sender of encoded frames from the publisher loop.
    pub frames: broadcast::Sender<Bytes>,
    /// Label of the most recent completed detection cycle.
    pub detections: DetectionState,
    /// Whether the detection network loaded at startup.
    pub model_loaded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentObjectResponse {
    pub object: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// Build the router. CORS is permissive: the stream and poller are consumed
/// by a browser frontend served from another origin.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/video_feed", get(video_feed))
        .route("/current_object", get(current_object))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Continuous MJPEG stream: one multipart section per pipeline cycle,
/// emitted until the client disconnects.
async fn video_feed(State(state): State<ApiState>) -> Response<Body> {
    info!("Stream subscriber attached");

    let receiver = state.frames.subscribe();
    let mut response = Response::new(Body::from_stream(mjpeg_stream(receiver)));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("multipart/x-mixed-replace; boundary=frame"),
    );
    response
}

/// Latest detected object for the polling TTS client.
async fn current_object(State(state): State<ApiState>) -> Json<CurrentObjectResponse> {
    Json(CurrentObjectResponse {
        object: state.detections.get(),
    })
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.model_loaded,
    })
}

/// Adapt a frame subscription into multipart body chunks.
///
/// Lag notifications mean this subscriber fell behind the bounded fan-out
/// ring; the stale frames have already been dropped, so delivery resumes
/// with the newest frame.
pub fn mjpeg_stream(
    receiver: broadcast::Receiver<Bytes>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    BroadcastStream::new(receiver).filter_map(|frame| match frame {
        Ok(jpeg) => Some(Ok(mjpeg_part(&jpeg))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!("Stream subscriber lagged, skipped {} frames", skipped);
            None
        }
    })
}

/// Frame one JPEG as a multipart section.
pub fn mjpeg_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        STREAM_BOUNDARY,
        jpeg.len()
    );

    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}
