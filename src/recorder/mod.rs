//! Recording coordinator
//!
//! `GazeRecorder` ticks the gaze logger at a fixed rate and runs the video
//! capture lifecycle alongside it. The two sides fail independently: a
//! capture error never stops gaze logging, and a log failure still lets the
//! capture session shut down cleanly.

pub mod error;
pub mod state;

pub use error::{RecordingError, RecordingResult};
pub use state::{RecorderConfig, RecordingSummary, SimulationConfig};

use crate::capture::session::CaptureSession;
use crate::capture::traits::VideoCaptureService;
use crate::gaze::anchor::GazeAnchor;
use crate::gaze::logger::GazeLogger;
use crate::gaze::provider::GazeProvider;
use chrono::Local;
use std::fs::File;
use std::future::Future;
use std::io::{LineWriter, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct GazeRecorder<P, A, W: Write = LineWriter<File>> {
    config: RecorderConfig,
    logger: GazeLogger<P, A, W>,
    capture: Option<Arc<Mutex<CaptureSession>>>,
}

impl<P: GazeProvider, A: GazeAnchor> GazeRecorder<P, A> {
    /// Open the gaze log and prepare (but do not start) the capture session.
    ///
    /// Fails if the log cannot be opened.
    pub fn new(
        config: RecorderConfig,
        provider: P,
        anchors: [A; 4],
        video: Option<Arc<dyn VideoCaptureService>>,
    ) -> RecordingResult<Self> {
        config.validate()?;
        let logger = GazeLogger::open(&config.data_dir, provider, anchors)?;
        Self::with_logger(config, logger, video)
    }
}

impl<P: GazeProvider, A: GazeAnchor, W: Write> GazeRecorder<P, A, W> {
    /// Record with an already opened gaze logger.
    pub fn with_logger(
        config: RecorderConfig,
        logger: GazeLogger<P, A, W>,
        video: Option<Arc<dyn VideoCaptureService>>,
    ) -> RecordingResult<Self> {
        config.validate()?;

        let capture = if config.capture_video {
            video.map(|service| Arc::new(Mutex::new(CaptureSession::new(service))))
        } else {
            None
        };

        Ok(Self {
            config,
            logger,
            capture,
        })
    }

    pub fn logger(&self) -> &GazeLogger<P, A, W> {
        &self.logger
    }

    /// Tick until `shutdown` resolves or a log write fails, then tear down.
    pub async fn run_until<F>(mut self, shutdown: F) -> RecordingResult<RecordingSummary>
    where
        F: Future<Output = ()>,
    {
        let startup = self.spawn_capture_startup();

        let period = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            "Gaze recording started at {}fps into {:?}",
            self.config.frame_rate,
            self.config.data_dir
        );

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                _ = interval.tick() => {
                    match self.logger.tick(Local::now()) {
                        Ok(rows) => tracing::trace!("Frame {}: {} rows", self.logger.frames(), rows),
                        Err(e) => {
                            tracing::error!("Gaze logging stopped: {}", e);
                            break Err(e);
                        }
                    }
                }
            }
        };

        let summary = self.teardown(startup).await;
        outcome?;
        summary
    }

    fn spawn_capture_startup(&self) -> Option<JoinHandle<RecordingResult<()>>> {
        let session = self.capture.clone()?;
        let data_dir = self.config.data_dir.clone();

        Some(tokio::spawn(async move {
            let mut session = session.lock().await;
            let result = session.start(&data_dir).await;
            if let Err(e) = &result {
                tracing::warn!("Video capture disabled for this session: {}", e);
            }
            result
        }))
    }

    async fn teardown(
        &mut self,
        startup: Option<JoinHandle<RecordingResult<()>>>,
    ) -> RecordingResult<RecordingSummary> {
        let mut capture_error = None;

        if let Some(handle) = startup {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => capture_error = Some(e.to_string()),
                Err(e) => {
                    tracing::error!("Capture startup task failed: {}", e);
                    capture_error = Some(e.to_string());
                }
            }
        }

        let mut video_path = None;
        let mut capture_state = None;
        if let Some(session) = &self.capture {
            let mut session = session.lock().await;
            video_path = session
                .video_path()
                .map(|p| p.to_string_lossy().to_string());
            if let Err(e) = session.shutdown().await {
                tracing::error!("Video capture shutdown failed: {}", e);
                capture_error.get_or_insert_with(|| e.to_string());
            }
            capture_state = Some(session.state());
        }

        self.logger.close()?;

        let summary = RecordingSummary {
            frames: self.logger.frames(),
            rows_written: self.logger.rows_written(),
            log_path: self.logger.path().to_string_lossy().to_string(),
            video_path,
            capture_state,
            capture_error,
        };
        tracing::info!(
            "Recording finished: {} frames, {} rows, video: {}",
            summary.frames,
            summary.rows_written,
            summary.video_path.as_deref().unwrap_or("none")
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::session::CaptureState;
    use crate::capture::simulated::{CaptureCall, SimulatedCaptureOptions, SimulatedVideoCapture};
    use crate::gaze::anchor::Marker;
    use crate::gaze::logger::{GazeLogger, LimitedSink, CSV_HEADER};
    use crate::gaze::types::{Eye, GazeReading, GazeType, QuerySpace, Vector3};
    use chrono::DateTime;

    fn all_valid(_: Eye, _: QuerySpace, _: DateTime<Local>) -> GazeReading {
        GazeReading::valid(Vector3::new(0.0, 1.6, 0.0), Vector3::new(0.0, 0.0, 1.0))
    }

    fn markers() -> [Marker; 4] {
        GazeType::ALL.map(|t| Marker::new(t.as_str()))
    }

    fn config(dir: &std::path::Path) -> RecorderConfig {
        RecorderConfig {
            data_dir: dir.to_path_buf(),
            frame_rate: 100.0,
            ..Default::default()
        }
    }

    fn capture(options: SimulatedCaptureOptions) -> SimulatedVideoCapture {
        SimulatedVideoCapture::new(SimulatedCaptureOptions {
            latency: Duration::from_millis(1),
            ..options
        })
    }

    fn stop_after(ms: u64) -> impl Future<Output = ()> {
        tokio::time::sleep(Duration::from_millis(ms))
    }

    #[tokio::test]
    async fn test_records_gaze_and_video() {
        let dir = tempfile::tempdir().unwrap();
        let video = capture(SimulatedCaptureOptions::default());
        let recorder =
            GazeRecorder::new(config(dir.path()), all_valid, markers(), Some(Arc::new(video.clone())))
                .unwrap();

        let summary = recorder.run_until(stop_after(120)).await.unwrap();

        assert!(summary.frames > 0);
        assert_eq!(summary.rows_written, 4 * summary.frames);
        assert!(summary.capture_error.is_none());
        assert_eq!(summary.capture_state, Some(CaptureState::Disposed));
        assert!(summary.video_path.unwrap().ends_with(".mp4"));

        let calls = video.calls();
        assert_eq!(
            &calls[calls.len() - 3..],
            &[
                CaptureCall::StopRecording,
                CaptureCall::StopVideoMode,
                CaptureCall::Dispose
            ]
        );

        let content = std::fs::read_to_string(&summary.log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len() as u64, 1 + summary.rows_written);
    }

    #[tokio::test]
    async fn test_capture_failure_does_not_stop_logging() {
        let dir = tempfile::tempdir().unwrap();
        let video = capture(SimulatedCaptureOptions {
            fail_create: true,
            ..Default::default()
        });
        let recorder =
            GazeRecorder::new(config(dir.path()), all_valid, markers(), Some(Arc::new(video.clone())))
                .unwrap();

        let summary = recorder.run_until(stop_after(80)).await.unwrap();

        assert!(summary.rows_written > 0);
        assert!(summary.capture_error.is_some());
        assert_eq!(summary.capture_state, Some(CaptureState::Uninitialized));
        assert_eq!(video.calls(), vec![CaptureCall::CreateDevice { show_holograms: false }]);
    }

    #[tokio::test]
    async fn test_teardown_without_recording_makes_no_capture_calls() {
        let dir = tempfile::tempdir().unwrap();
        let video = capture(SimulatedCaptureOptions {
            fail_recording: true,
            ..Default::default()
        });
        let recorder =
            GazeRecorder::new(config(dir.path()), all_valid, markers(), Some(Arc::new(video.clone())))
                .unwrap();

        let summary = recorder.run_until(stop_after(80)).await.unwrap();

        assert_eq!(summary.capture_state, Some(CaptureState::VideoModeStarted));
        assert!(summary.video_path.is_none());
        let calls = video.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[2], CaptureCall::StartRecording(_)));
    }

    #[tokio::test]
    async fn test_video_disabled_by_config() {
        let dir = tempfile::tempdir().unwrap();
        let video = capture(SimulatedCaptureOptions::default());
        let config = RecorderConfig {
            capture_video: false,
            ..config(dir.path())
        };
        let recorder =
            GazeRecorder::new(config, all_valid, markers(), Some(Arc::new(video.clone()))).unwrap();

        let summary = recorder.run_until(stop_after(50)).await.unwrap();

        assert!(summary.capture_state.is_none());
        assert!(video.calls().is_empty());
    }

    #[tokio::test]
    async fn test_log_open_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let result = GazeRecorder::new(config(&blocker), all_valid, markers(), None);
        assert!(matches!(result, Err(RecordingError::LogOpen { .. })));
    }

    #[tokio::test]
    async fn test_write_failure_stops_logging_but_shuts_capture_down() {
        let dir = tempfile::tempdir().unwrap();
        let video = capture(SimulatedCaptureOptions::default());
        let sink = LimitedSink::new(2);
        let data = sink.data.clone();
        let logger =
            GazeLogger::with_writer(dir.path().join("gaze_data.csv"), sink, all_valid, markers())
                .unwrap();
        let recorder =
            GazeRecorder::with_logger(config(dir.path()), logger, Some(Arc::new(video.clone())))
                .unwrap();

        let result = recorder.run_until(stop_after(5_000)).await;
        assert!(matches!(result, Err(RecordingError::LogWrite(_))));

        let calls = video.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(
            &calls[3..],
            &[
                CaptureCall::StopRecording,
                CaptureCall::StopVideoMode,
                CaptureCall::Dispose
            ]
        );

        let content = String::from_utf8(data.lock().clone()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
    }
}
