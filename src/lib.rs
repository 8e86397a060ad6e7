//! Gaze Recorder - eye-gaze logging with a synchronized video capture.
//!
//! Samples an eye tracker every frame, places gaze markers, writes the
//! readings to `gaze_data.csv` and records a video of the session.

pub mod capture;
pub mod gaze;
pub mod recorder;

use anyhow::Context;
use capture::{SimulatedCaptureOptions, SimulatedVideoCapture};
use gaze::{GazeType, Marker, SimulatedGazeProvider};
use recorder::{GazeRecorder, RecorderConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run a recording session with the simulated tracker and capture service
/// until Ctrl-C.
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gaze_recorder=debug,gaze_recorder_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gaze Recorder v{}", env!("CARGO_PKG_VERSION"));

    let config = RecorderConfig::load_or_default().context("Failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let sim = &config.simulation;
        let provider = SimulatedGazeProvider::new(
            chrono::Local::now(),
            Duration::from_millis(sim.sweep_period_ms),
            Duration::from_millis(sim.blink_interval_ms),
            Duration::from_millis(sim.blink_duration_ms),
        );
        let video = SimulatedVideoCapture::new(SimulatedCaptureOptions {
            latency: Duration::from_millis(sim.capture_latency_ms),
            ..Default::default()
        });
        let anchors = GazeType::ALL.map(|t| Marker::new(t.as_str()));

        let recorder = GazeRecorder::new(config, provider, anchors, Some(Arc::new(video)))
            .context("Failed to initialize gaze recorder")?;

        let summary = recorder
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
            })
            .await?;

        tracing::info!("{}", serde_json::to_string_pretty(&summary)?);
        Ok::<(), anyhow::Error>(())
    })
}
