//! Eye gaze sampling and logging
//!
//! Readings come from a `GazeProvider`, are projected onto anchors and
//! appended to a CSV log by `GazeLogger`.

pub mod anchor;
pub mod logger;
pub mod provider;
pub mod types;

pub use anchor::{GazeAnchor, Marker};
pub use logger::{GazeLogger, CSV_HEADER, GAZE_LOG_FILE_NAME};
pub use provider::{GazeProvider, SimulatedGazeProvider};
pub use types::{Eye, GazeReading, GazeType, QuerySpace, Vector3, LOOK_AHEAD_DISTANCE};
