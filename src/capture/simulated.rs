//! In-process stand-in for the platform capture service
//!
//! Records every call it receives so the lifecycle can be inspected, and can
//! be told to fail individual steps.

use crate::capture::traits::{
    AudioState, CameraParameters, Resolution, VideoCaptureDevice, VideoCaptureResult,
    VideoCaptureService,
};
use async_trait::async_trait;
use parking_lot::Mutex as ParkingMutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// HRESULT reported for injected failures (E_FAIL)
const E_FAIL: i64 = 0x8000_4005;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureCall {
    CreateDevice { show_holograms: bool },
    StartVideoMode(CameraParameters, AudioState),
    StartRecording(PathBuf),
    StopRecording,
    StopVideoMode,
    Dispose,
}

#[derive(Debug, Clone)]
pub struct SimulatedCaptureOptions {
    /// Supported resolutions with their frame rates
    pub modes: Vec<(Resolution, Vec<f32>)>,
    pub fail_create: bool,
    pub fail_video_mode: bool,
    pub fail_recording: bool,
    /// Delay before each async step completes
    pub latency: Duration,
}

impl Default for SimulatedCaptureOptions {
    fn default() -> Self {
        Self {
            modes: vec![
                (Resolution::new(1280, 720), vec![15.0, 30.0]),
                (Resolution::new(1920, 1080), vec![15.0, 30.0]),
                (Resolution::new(2272, 1278), vec![15.0, 30.0]),
            ],
            fail_create: false,
            fail_video_mode: false,
            fail_recording: false,
            latency: Duration::from_millis(5),
        }
    }
}

#[derive(Clone)]
pub struct SimulatedVideoCapture {
    options: SimulatedCaptureOptions,
    calls: Arc<ParkingMutex<Vec<CaptureCall>>>,
}

impl SimulatedVideoCapture {
    pub fn new(options: SimulatedCaptureOptions) -> Self {
        Self {
            options,
            calls: Arc::new(ParkingMutex::new(Vec::new())),
        }
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<CaptureCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl Default for SimulatedVideoCapture {
    fn default() -> Self {
        Self::new(SimulatedCaptureOptions::default())
    }
}

#[async_trait]
impl VideoCaptureService for SimulatedVideoCapture {
    fn supported_resolutions(&self) -> Vec<Resolution> {
        self.options.modes.iter().map(|(res, _)| *res).collect()
    }

    fn supported_frame_rates(&self, resolution: Resolution) -> Vec<f32> {
        self.options
            .modes
            .iter()
            .find(|(res, _)| *res == resolution)
            .map(|(_, rates)| rates.clone())
            .unwrap_or_default()
    }

    async fn create_device(&self, show_holograms: bool) -> Option<Box<dyn VideoCaptureDevice>> {
        self.calls
            .lock()
            .push(CaptureCall::CreateDevice { show_holograms });
        tokio::time::sleep(self.options.latency).await;

        if self.options.fail_create {
            return None;
        }

        Some(Box::new(SimulatedDevice {
            options: self.options.clone(),
            calls: self.calls.clone(),
            video_mode: false,
            recording: false,
        }))
    }
}

struct SimulatedDevice {
    options: SimulatedCaptureOptions,
    calls: Arc<ParkingMutex<Vec<CaptureCall>>>,
    video_mode: bool,
    recording: bool,
}

impl SimulatedDevice {
    async fn complete(&self, call: CaptureCall, fail: bool) -> VideoCaptureResult {
        self.calls.lock().push(call);
        tokio::time::sleep(self.options.latency).await;
        if fail {
            VideoCaptureResult::failed(E_FAIL)
        } else {
            VideoCaptureResult::ok()
        }
    }
}

#[async_trait]
impl VideoCaptureDevice for SimulatedDevice {
    async fn start_video_mode(
        &mut self,
        parameters: CameraParameters,
        audio: AudioState,
    ) -> VideoCaptureResult {
        let fail = self.options.fail_video_mode;
        let result = self
            .complete(CaptureCall::StartVideoMode(parameters, audio), fail)
            .await;
        self.video_mode = result.success;
        result
    }

    async fn start_recording(&mut self, path: &Path) -> VideoCaptureResult {
        let fail = self.options.fail_recording || !self.video_mode;
        let result = self
            .complete(CaptureCall::StartRecording(path.to_path_buf()), fail)
            .await;
        self.recording = result.success;
        result
    }

    async fn stop_recording(&mut self) -> VideoCaptureResult {
        let fail = !self.recording;
        let result = self.complete(CaptureCall::StopRecording, fail).await;
        self.recording = false;
        result
    }

    async fn stop_video_mode(&mut self) -> VideoCaptureResult {
        let fail = !self.video_mode;
        let result = self.complete(CaptureCall::StopVideoMode, fail).await;
        self.video_mode = false;
        result
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn dispose(self: Box<Self>) {
        self.calls.lock().push(CaptureCall::Dispose);
    }
}
