//! Per-frame gaze logging
//!
//! `GazeLogger` owns the CSV log. Every tick it samples the four gaze types,
//! moves the matching anchors and appends one row per valid reading.

use crate::gaze::anchor::GazeAnchor;
use crate::gaze::provider::GazeProvider;
use crate::gaze::types::{GazeReading, GazeType, QuerySpace};
use crate::recorder::error::{RecordingError, RecordingResult};
use chrono::{DateTime, Local, Timelike};
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the gaze log inside the data directory
pub const GAZE_LOG_FILE_NAME: &str = "gaze_data.csv";

pub const CSV_HEADER: &str = "Timestamp,GazeType,EyePositionX,EyePositionY,EyePositionZ,GazeDirectionX,GazeDirectionY,GazeDirectionZ";

/// ISO-8601 timestamp with 100ns precision and UTC offset,
/// e.g. `2024-05-01T12:00:00.1234567+02:00`.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    format!(
        "{}.{:07}{}",
        at.format("%Y-%m-%dT%H:%M:%S"),
        (at.nanosecond() % 1_000_000_000) / 100,
        at.format("%:z")
    )
}

/// One CSV line (including the trailing newline) for a valid reading.
///
/// Floats use Rust's shortest round-trip formatting, which never depends on
/// the host locale.
pub fn format_row(timestamp: &str, gaze_type: GazeType, reading: &GazeReading) -> String {
    let p = reading.eye_position;
    let d = reading.gaze_direction;
    format!(
        "{},{},{},{},{},{},{},{}\n",
        timestamp, gaze_type, p.x, p.y, p.z, d.x, d.y, d.z
    )
}

pub struct GazeLogger<P, A, W: Write = LineWriter<File>> {
    path: PathBuf,
    writer: Option<W>,
    provider: P,
    anchors: [A; 4],
    frames: u64,
    rows_written: u64,
}

impl<P: GazeProvider, A: GazeAnchor> GazeLogger<P, A> {
    /// Create (or truncate) `<data_dir>/gaze_data.csv` and write the header.
    ///
    /// `anchors` are indexed in `GazeType::ALL` order.
    pub fn open(data_dir: &Path, provider: P, anchors: [A; 4]) -> RecordingResult<Self> {
        let path = data_dir.join(GAZE_LOG_FILE_NAME);
        let open_err = |source| RecordingError::LogOpen {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(data_dir).map_err(open_err)?;
        let file = File::create(&path).map_err(open_err)?;
        Self::with_writer(path.clone(), LineWriter::new(file), provider, anchors)
    }
}

impl<P: GazeProvider, A: GazeAnchor, W: Write> GazeLogger<P, A, W> {
    /// Log into an already opened sink. `path` is only used for reporting.
    pub fn with_writer(
        path: PathBuf,
        mut writer: W,
        provider: P,
        anchors: [A; 4],
    ) -> RecordingResult<Self> {
        writer
            .write_all(format!("{}\n", CSV_HEADER).as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|source| RecordingError::LogOpen {
                path: path.clone(),
                source,
            })?;

        tracing::info!("Gaze log opened at {:?}", path);

        Ok(Self {
            path,
            writer: Some(writer),
            provider,
            anchors,
            frames: 0,
            rows_written: 0,
        })
    }

    /// Sample all gaze types at `now` and log the valid ones.
    ///
    /// Returns the number of rows written this frame.
    pub fn tick(&mut self, now: DateTime<Local>) -> RecordingResult<usize> {
        if self.writer.is_none() {
            return Err(RecordingError::LogClosed);
        }

        let timestamp = format_timestamp(&now);
        let mut written = 0;

        for gaze_type in GazeType::ALL {
            let (eye, space) = gaze_type.query();
            let reading = self.provider.reading(eye, space, now);
            let anchor = &mut self.anchors[gaze_type.index()];

            let Some(point) = reading.anchor_point() else {
                anchor.set_active(false);
                continue;
            };

            match space {
                QuerySpace::World => anchor.set_position(point),
                QuerySpace::Camera => anchor.set_local_position(point),
            }
            anchor.set_active(true);

            self.write_row(&format_row(&timestamp, gaze_type, &reading))?;
            self.rows_written += 1;
            written += 1;
        }

        self.frames += 1;
        Ok(written)
    }

    fn write_row(&mut self, row: &str) -> RecordingResult<()> {
        let writer = self.writer.as_mut().ok_or(RecordingError::LogClosed)?;
        writer
            .write_all(row.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(RecordingError::LogWrite)
    }
}

impl<P, A, W: Write> GazeLogger<P, A, W> {
    /// Flush and close the log. Closing twice is a no-op.
    pub fn close(&mut self) -> RecordingResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(RecordingError::LogWrite)?;
            tracing::info!(
                "Gaze log closed ({} frames, {} rows)",
                self.frames,
                self.rows_written
            );
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn anchor(&self, gaze_type: GazeType) -> &A {
        &self.anchors[gaze_type.index()]
    }
}

impl<P, A, W: Write> Drop for GazeLogger<P, A, W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close gaze log on drop: {}", e);
        }
    }
}

/// In-memory log sink that refuses writes once it holds `max_lines` lines.
///
/// A refused write leaves the buffer untouched.
#[cfg(test)]
pub(crate) struct LimitedSink {
    pub data: std::sync::Arc<parking_lot::Mutex<Vec<u8>>>,
    pub max_lines: usize,
}

#[cfg(test)]
impl LimitedSink {
    pub fn new(max_lines: usize) -> Self {
        Self {
            data: Default::default(),
            max_lines,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.data.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
impl Write for LimitedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut data = self.data.lock();
        if data.iter().filter(|&&b| b == b'\n').count() >= self.max_lines {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no space left on device",
            ));
        }
        data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
