//! HTTP service exposing hourly AQI forecasts from a pre-trained model.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use aqf_core::context::{ArtifactPaths, ServiceState};
use axum::routing::{get, post};
use clap::Parser;

mod routes;

#[derive(Parser)]
#[command(name = "aqf-server", version, about = "Hourly AQI forecast service")]
struct Cli {
    /// Address and port to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: SocketAddr,

    /// Path to the ONNX forecast model
    #[arg(long, default_value = "model.onnx")]
    model: PathBuf,

    /// Path to the input scaler attribute file
    #[arg(long, default_value = "input_scaler_attributes.json")]
    input_scaler: PathBuf,

    /// Path to the target scaler attribute file
    #[arg(long, default_value = "target_scaler_attributes.json")]
    target_scaler: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // A failed load still serves, refusing predictions with the reason
    let state = Arc::new(ServiceState::initialize(&ArtifactPaths {
        model: cli.model,
        input_scaler: cli.input_scaler,
        target_scaler: cli.target_scaler,
    }));

    let app = axum::Router::new()
        .route("/", get(routes::index))
        .route("/predict", post(routes::predict))
        .with_state(state);

    log::info!("Listening on {}", cli.listen);
    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
