//! Video capture
//!
//! The platform capture service is reached through the traits in `traits`;
//! `CaptureSession` owns the device and sequences its lifecycle.

pub mod session;
pub mod simulated;
pub mod traits;

pub use session::{recording_path, CaptureSession, CaptureState};
pub use simulated::{CaptureCall, SimulatedCaptureOptions, SimulatedVideoCapture};
pub use traits::{
    AudioState, CameraParameters, PixelFormat, Resolution, VideoCaptureDevice, VideoCaptureResult,
    VideoCaptureService,
};
