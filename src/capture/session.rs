//! Video capture session lifecycle
//!
//! Drives a `VideoCaptureService` through a strictly linear sequence:
//! create device → start video mode → start recording, and on teardown
//! stop recording → stop video mode → dispose. Each step waits for the
//! previous one to complete; nothing is retried.

use crate::capture::traits::{
    best_capture_mode, AudioState, CameraParameters, PixelFormat, Resolution, VideoCaptureDevice,
    VideoCaptureService,
};
use crate::recorder::error::{RecordingError, RecordingResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureState {
    Uninitialized,
    DeviceCreated,
    VideoModeStarted,
    Recording,
    Stopping,
    VideoModeStopped,
    Disposed,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Uninitialized => "uninitialized",
            CaptureState::DeviceCreated => "device-created",
            CaptureState::VideoModeStarted => "video-mode-started",
            CaptureState::Recording => "recording",
            CaptureState::Stopping => "stopping",
            CaptureState::VideoModeStopped => "video-mode-stopped",
            CaptureState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// `<data_dir>/GazeVideo_<yyyyMMddHHmmss>.mp4`
pub fn recording_path(data_dir: &Path, now: DateTime<Local>) -> PathBuf {
    data_dir.join(format!("GazeVideo_{}.mp4", now.format("%Y%m%d%H%M%S")))
}

pub struct CaptureSession {
    service: Arc<dyn VideoCaptureService>,
    device: Option<Box<dyn VideoCaptureDevice>>,
    state: CaptureState,
    in_flight: Option<&'static str>,
    capture_mode: Option<(Resolution, f32)>,
    video_path: Option<PathBuf>,
}

impl CaptureSession {
    pub fn new(service: Arc<dyn VideoCaptureService>) -> Self {
        Self {
            service,
            device: None,
            state: CaptureState::Uninitialized,
            in_flight: None,
            capture_mode: None,
            video_path: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Selected resolution and frame rate, once a device exists
    pub fn capture_mode(&self) -> Option<(Resolution, f32)> {
        self.capture_mode
    }

    /// Output file of the active (or last started) recording
    pub fn video_path(&self) -> Option<&Path> {
        self.video_path.as_deref()
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
            && self.device.as_ref().is_some_and(|d| d.is_recording())
    }

    /// Run the whole startup sequence, recording into `data_dir`.
    pub async fn start(&mut self, data_dir: &Path) -> RecordingResult<()> {
        self.create_device().await?;
        self.start_video_mode().await?;
        self.start_recording(&recording_path(data_dir, Local::now()))
            .await
    }

    fn begin(&mut self, step: &'static str, expected: CaptureState) -> RecordingResult<()> {
        if let Some(pending) = self.in_flight {
            return Err(RecordingError::StepInFlight(pending));
        }
        if self.state != expected {
            return Err(RecordingError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        self.in_flight = Some(step);
        Ok(())
    }

    fn finish(&mut self, next: Option<CaptureState>) {
        self.in_flight = None;
        if let Some(next) = next {
            self.state = next;
        }
    }

    /// Pick the best capture mode and ask the service for a device.
    pub async fn create_device(&mut self) -> RecordingResult<()> {
        self.begin("create-device", CaptureState::Uninitialized)?;

        let Some(mode) = best_capture_mode(self.service.as_ref()) else {
            self.finish(None);
            tracing::error!("No supported video capture resolution");
            return Err(RecordingError::NoSupportedResolution);
        };

        let device = self.service.create_device(false).await;
        match device {
            Some(device) => {
                self.device = Some(device);
                self.capture_mode = Some(mode);
                self.finish(Some(CaptureState::DeviceCreated));
                tracing::info!("Created VideoCapture instance ({} @ {}fps)", mode.0, mode.1);
                Ok(())
            }
            None => {
                self.finish(None);
                tracing::error!("Failed to create VideoCapture instance");
                Err(RecordingError::DeviceCreationFailed)
            }
        }
    }

    pub async fn start_video_mode(&mut self) -> RecordingResult<()> {
        self.begin("start-video-mode", CaptureState::DeviceCreated)?;

        let Some((resolution, frame_rate)) = self.capture_mode else {
            self.finish(None);
            return Err(RecordingError::NoSupportedResolution);
        };
        let parameters = CameraParameters {
            hologram_opacity: 0.0,
            frame_rate,
            resolution,
            pixel_format: PixelFormat::Bgra32,
        };

        let Some(device) = self.device.as_mut() else {
            self.finish(None);
            return Err(RecordingError::DeviceCreationFailed);
        };
        let result = device
            .start_video_mode(parameters, AudioState::ApplicationAndMicAudio)
            .await;

        // The recording request follows regardless; a device without video
        // mode reports the failure there.
        if result.success {
            tracing::info!("Started video capture mode");
        } else {
            tracing::error!("Failed to start video capture mode (hresult {:#x})", result.hresult);
        }
        self.finish(Some(CaptureState::VideoModeStarted));
        Ok(())
    }

    /// Start recording to `path`. A failure leaves video mode running.
    pub async fn start_recording(&mut self, path: &Path) -> RecordingResult<()> {
        if self.state == CaptureState::Recording {
            return Err(RecordingError::AlreadyRecording);
        }
        self.begin("start-recording", CaptureState::VideoModeStarted)?;

        let Some(device) = self.device.as_mut() else {
            self.finish(None);
            return Err(RecordingError::DeviceCreationFailed);
        };
        let result = device.start_recording(path).await;

        if result.success {
            self.video_path = Some(path.to_path_buf());
            self.finish(Some(CaptureState::Recording));
            tracing::info!("Started recording video to {:?}", path);
            Ok(())
        } else {
            self.finish(None);
            tracing::error!("Failed to start video recording (hresult {:#x})", result.hresult);
            Err(RecordingError::RecordingStartFailed(result.hresult))
        }
    }

    /// Stop recording, leave video mode and dispose the device.
    ///
    /// Does nothing unless a recording is active. Returns whether the
    /// sequence ran.
    pub async fn shutdown(&mut self) -> RecordingResult<bool> {
        if let Some(pending) = self.in_flight {
            return Err(RecordingError::StepInFlight(pending));
        }
        if !self.is_recording() {
            tracing::debug!("No active recording at teardown (state: {})", self.state);
            return Ok(false);
        }
        let Some(mut device) = self.device.take() else {
            return Ok(false);
        };

        self.in_flight = Some("stop-recording");
        self.state = CaptureState::Stopping;
        let result = device.stop_recording().await;
        if result.success {
            tracing::info!("Stopped recording video");
        } else {
            tracing::warn!("Stop recording reported failure (hresult {:#x})", result.hresult);
        }

        self.in_flight = Some("stop-video-mode");
        let result = device.stop_video_mode().await;
        if result.success {
            tracing::info!("Stopped video capture mode");
        } else {
            tracing::warn!("Stop video mode reported failure (hresult {:#x})", result.hresult);
        }
        self.finish(Some(CaptureState::VideoModeStopped));

        device.dispose();
        self.state = CaptureState::Disposed;
        tracing::info!("Video capture device disposed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::simulated::{CaptureCall, SimulatedCaptureOptions, SimulatedVideoCapture};
    use chrono::TimeZone;
    use std::time::Duration;

    fn service(options: SimulatedCaptureOptions) -> (SimulatedVideoCapture, CaptureSession) {
        let capture = SimulatedVideoCapture::new(SimulatedCaptureOptions {
            latency: Duration::ZERO,
            ..options
        });
        let session = CaptureSession::new(Arc::new(capture.clone()));
        (capture, session)
    }

    #[test]
    fn test_recording_path_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = recording_path(Path::new("/data"), now);
        assert_eq!(path, Path::new("/data/GazeVideo_20240309070501.mp4"));
    }

    #[tokio::test]
    async fn test_start_sequence() {
        let (capture, mut session) = service(SimulatedCaptureOptions::default());

        session.start(Path::new("/data")).await.unwrap();

        assert_eq!(session.state(), CaptureState::Recording);
        assert!(session.is_recording());
        assert_eq!(session.capture_mode(), Some((Resolution::new(2272, 1278), 30.0)));

        let calls = capture.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], CaptureCall::CreateDevice { show_holograms: false });
        match &calls[1] {
            CaptureCall::StartVideoMode(params, audio) => {
                assert_eq!(params.hologram_opacity, 0.0);
                assert_eq!(params.frame_rate, 30.0);
                assert_eq!(params.resolution, Resolution::new(2272, 1278));
                assert_eq!(params.pixel_format, PixelFormat::Bgra32);
                assert_eq!(*audio, AudioState::ApplicationAndMicAudio);
            }
            other => panic!("unexpected call {:?}", other),
        }
        match &calls[2] {
            CaptureCall::StartRecording(path) => {
                let name = path.file_name().unwrap().to_string_lossy();
                assert!(name.starts_with("GazeVideo_") && name.ends_with(".mp4"));
                assert_eq!(name.len(), "GazeVideo_yyyyMMddHHmmss.mp4".len());
                assert_eq!(session.video_path(), Some(path.as_path()));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mode_selection_prefers_pixels_then_frame_rate() {
        let (capture, mut session) = service(SimulatedCaptureOptions {
            modes: vec![
                (Resolution::new(3000, 100), vec![60.0]),
                (Resolution::new(1920, 1080), vec![24.0, 60.0, 30.0]),
                (Resolution::new(1280, 720), vec![120.0]),
            ],
            ..Default::default()
        });

        session.create_device().await.unwrap();
        assert_eq!(session.capture_mode(), Some((Resolution::new(1920, 1080), 60.0)));
        assert_eq!(capture.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_device_creation_failure_stays_uninitialized() {
        let (capture, mut session) = service(SimulatedCaptureOptions {
            fail_create: true,
            ..Default::default()
        });

        let result = session.start(Path::new("/data")).await;
        assert!(matches!(result, Err(RecordingError::DeviceCreationFailed)));
        assert_eq!(session.state(), CaptureState::Uninitialized);
        assert_eq!(capture.calls().len(), 1);

        assert!(!session.shutdown().await.unwrap());
        assert_eq!(capture.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_no_supported_resolution() {
        let (capture, mut session) = service(SimulatedCaptureOptions {
            modes: vec![],
            ..Default::default()
        });

        let result = session.start(Path::new("/data")).await;
        assert!(matches!(result, Err(RecordingError::NoSupportedResolution)));
        assert_eq!(session.state(), CaptureState::Uninitialized);
        assert!(capture.calls().is_empty());
    }

    #[tokio::test]
    async fn test_recording_failure_keeps_video_mode() {
        let (capture, mut session) = service(SimulatedCaptureOptions {
            fail_recording: true,
            ..Default::default()
        });

        let result = session.start(Path::new("/data")).await;
        assert!(matches!(result, Err(RecordingError::RecordingStartFailed(_))));
        assert_eq!(session.state(), CaptureState::VideoModeStarted);
        assert!(session.video_path().is_none());

        capture.clear_calls();
        assert!(!session.shutdown().await.unwrap());
        assert!(capture.calls().is_empty());
    }

    #[tokio::test]
    async fn test_video_mode_failure_still_requests_recording() {
        let (capture, mut session) = service(SimulatedCaptureOptions {
            fail_video_mode: true,
            ..Default::default()
        });

        let result = session.start(Path::new("/data")).await;
        assert!(matches!(result, Err(RecordingError::RecordingStartFailed(_))));
        assert_eq!(session.state(), CaptureState::VideoModeStarted);

        let calls = capture.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[2], CaptureCall::StartRecording(_)));

        capture.clear_calls();
        assert!(!session.shutdown().await.unwrap());
        assert!(capture.calls().is_empty());
    }

    #[tokio::test]
    async fn test_second_recording_start_rejected() {
        let (capture, mut session) = service(SimulatedCaptureOptions::default());
        session.start(Path::new("/data")).await.unwrap();

        let result = session.start_recording(Path::new("/data/other.mp4")).await;
        assert!(matches!(result, Err(RecordingError::AlreadyRecording)));
        assert_eq!(capture.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_steps_out_of_order_rejected() {
        let (capture, mut session) = service(SimulatedCaptureOptions::default());

        let result = session.start_video_mode().await;
        assert!(matches!(
            result,
            Err(RecordingError::InvalidState {
                expected: CaptureState::DeviceCreated,
                actual: CaptureState::Uninitialized,
            })
        ));
        assert!(capture.calls().is_empty());

        session.create_device().await.unwrap();
        assert!(matches!(
            session.create_device().await,
            Err(RecordingError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_sequence() {
        let (capture, mut session) = service(SimulatedCaptureOptions::default());
        session.start(Path::new("/data")).await.unwrap();
        capture.clear_calls();

        assert!(session.shutdown().await.unwrap());

        assert_eq!(
            capture.calls(),
            vec![
                CaptureCall::StopRecording,
                CaptureCall::StopVideoMode,
                CaptureCall::Dispose
            ]
        );
        assert_eq!(session.state(), CaptureState::Disposed);
        assert!(!session.is_recording());

        // Already disposed: nothing left to do
        assert!(!session.shutdown().await.unwrap());
        assert_eq!(capture.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_abandoned_step_blocks_session() {
        let capture = SimulatedVideoCapture::new(SimulatedCaptureOptions {
            latency: Duration::from_secs(5),
            ..Default::default()
        });
        let mut session = CaptureSession::new(Arc::new(capture.clone()));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), session.start(Path::new("/data"))).await;
        assert!(timed_out.is_err());

        assert!(matches!(
            session.create_device().await,
            Err(RecordingError::StepInFlight("create-device"))
        ));
        assert!(matches!(
            session.shutdown().await,
            Err(RecordingError::StepInFlight("create-device"))
        ));
    }
}
