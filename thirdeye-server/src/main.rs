// ThirdEye server - live detection stream for assistive vision

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use thirdeye_server::http::{create_router, ApiState};
use thirdeye_vision::{Camera, DetectionState, ModelAssets, StreamPublisher, VisionConfig, YoloNetwork};
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "thirdeye-server")]
#[command(about = "Camera object-detection stream with a polling detection endpoint")]
struct Args {
    /// HTTP listen port
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Capture device index
    #[arg(long, default_value_t = 0)]
    camera_id: u32,

    /// Directory holding the network config, weights and class names
    #[arg(long, default_value = "./models")]
    model_dir: PathBuf,

    /// Target capture frame rate
    #[arg(long, default_value_t = 30)]
    frame_rate: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = VisionConfig {
        camera_id: args.camera_id,
        frame_rate: args.frame_rate,
        model_dir: args.model_dir,
        ..VisionConfig::default()
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!("Starting ThirdEye...");

    // Model absence is tolerated: the stream still runs, unannotated, and
    // the poller sees an empty label.
    let assets = ModelAssets::resolve(&config.model_dir);
    let network = YoloNetwork::load(&assets, config.input_size);
    let model_loaded = network.is_loaded();

    let camera = Camera::open(&config)
        .map_err(|e| anyhow::anyhow!("Camera initialization failed: {}", e))?;

    let detections = DetectionState::new();
    let publisher = StreamPublisher::start(camera, network, detections.clone(), config);
    info!("Detection pipeline running");

    let state = ApiState {
        frames: publisher.frame_sender(),
        detections,
        model_loaded,
    };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("Shutting down ThirdEye...");
    publisher.stop().await;
    info!("ThirdEye stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
