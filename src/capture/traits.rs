//! Video capture service interface
//!
//! The platform capture API is consumed through these traits. Each async
//! method resolves when the platform reports completion of the step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Supported capture resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit BGRA
    Bgra32,
    Nv12,
    Jpeg,
}

/// Audio sources mixed into the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioState {
    MicAudio,
    ApplicationAudio,
    ApplicationAndMicAudio,
    None,
}

/// Capture configuration handed to the device when video mode starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraParameters {
    /// Opacity of rendered holograms in the captured frames (0 = hidden)
    pub hologram_opacity: f32,
    pub frame_rate: f32,
    pub resolution: Resolution,
    pub pixel_format: PixelFormat,
}

/// Completion status of an asynchronous capture step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCaptureResult {
    pub success: bool,
    /// Platform status code (0 on success)
    pub hresult: i64,
}

impl VideoCaptureResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            hresult: 0,
        }
    }

    pub fn failed(hresult: i64) -> Self {
        Self {
            success: false,
            hresult,
        }
    }
}

/// Platform video capture service
#[async_trait]
pub trait VideoCaptureService: Send + Sync {
    fn supported_resolutions(&self) -> Vec<Resolution>;

    fn supported_frame_rates(&self, resolution: Resolution) -> Vec<f32>;

    /// Create a capture device. `None` if the platform refused.
    async fn create_device(&self, show_holograms: bool) -> Option<Box<dyn VideoCaptureDevice>>;
}

/// Handle to an open capture device
#[async_trait]
pub trait VideoCaptureDevice: Send {
    async fn start_video_mode(
        &mut self,
        parameters: CameraParameters,
        audio: AudioState,
    ) -> VideoCaptureResult;

    async fn start_recording(&mut self, path: &Path) -> VideoCaptureResult;

    async fn stop_recording(&mut self) -> VideoCaptureResult;

    async fn stop_video_mode(&mut self) -> VideoCaptureResult;

    fn is_recording(&self) -> bool;

    /// Release the device
    fn dispose(self: Box<Self>);
}

/// Highest pixel-count resolution and the highest frame rate supported at it
pub fn best_capture_mode(service: &dyn VideoCaptureService) -> Option<(Resolution, f32)> {
    let resolution = service
        .supported_resolutions()
        .into_iter()
        .max_by_key(Resolution::pixel_count)?;
    let frame_rate = service
        .supported_frame_rates(resolution)
        .into_iter()
        .filter(|fps| fps.is_finite())
        .max_by(|a, b| a.total_cmp(b))?;
    Some((resolution, frame_rate))
}
