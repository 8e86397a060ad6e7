//! Gaze data sources
//!
//! The eye tracker is consumed through `GazeProvider`. A deterministic
//! `SimulatedGazeProvider` stands in for real hardware.

use crate::gaze::types::{Eye, GazeReading, QuerySpace, Vector3};
use chrono::{DateTime, Local};
use std::f32::consts::TAU;
use std::time::Duration;

/// Source of per-frame eye gaze samples
pub trait GazeProvider: Send {
    /// Sample for `eye` in `space` at time `at`
    fn reading(&self, eye: Eye, space: QuerySpace, at: DateTime<Local>) -> GazeReading;
}

impl<F> GazeProvider for F
where
    F: Fn(Eye, QuerySpace, DateTime<Local>) -> GazeReading + Send,
{
    fn reading(&self, eye: Eye, space: QuerySpace, at: DateTime<Local>) -> GazeReading {
        self(eye, space, at)
    }
}

/// Half the interpupillary distance, in meters
const EYE_OFFSET: f32 = 0.032;

/// Standing eye height in world space, in meters
const EYE_HEIGHT: f32 = 1.6;

/// Gaze that sweeps a slow circle in front of the viewer, with periodic blinks.
///
/// During a blink every reading is invalid.
#[derive(Debug, Clone)]
pub struct SimulatedGazeProvider {
    origin: DateTime<Local>,
    sweep_period: Duration,
    sweep_radius: f32,
    blink_interval: Duration,
    blink_duration: Duration,
}

impl SimulatedGazeProvider {
    pub fn new(
        origin: DateTime<Local>,
        sweep_period: Duration,
        blink_interval: Duration,
        blink_duration: Duration,
    ) -> Self {
        Self {
            origin,
            sweep_period,
            sweep_radius: 0.25,
            blink_interval,
            blink_duration,
        }
    }

    fn elapsed(&self, at: DateTime<Local>) -> Duration {
        at.signed_duration_since(self.origin)
            .to_std()
            .unwrap_or_default()
    }

    /// Whether the eyes are closed at `at`
    pub fn is_blinking(&self, at: DateTime<Local>) -> bool {
        let interval = self.blink_interval.as_micros();
        if interval == 0 {
            return false;
        }
        let blink = self.blink_duration.as_micros().min(interval);
        let phase = self.elapsed(at).as_micros() % interval;
        phase >= interval - blink
    }

    fn direction(&self, at: DateTime<Local>) -> Vector3 {
        let period = self.sweep_period.as_secs_f32().max(f32::EPSILON);
        let angle = TAU * (self.elapsed(at).as_secs_f32() / period).fract();
        Vector3::new(
            self.sweep_radius * angle.cos(),
            self.sweep_radius * angle.sin(),
            1.0,
        )
        .normalized()
    }
}

impl GazeProvider for SimulatedGazeProvider {
    fn reading(&self, eye: Eye, space: QuerySpace, at: DateTime<Local>) -> GazeReading {
        if self.is_blinking(at) {
            return GazeReading::invalid();
        }

        let lateral = match eye {
            Eye::Left => -EYE_OFFSET,
            Eye::Right => EYE_OFFSET,
            Eye::Combined => 0.0,
        };
        let height = match space {
            QuerySpace::World => EYE_HEIGHT,
            QuerySpace::Camera => 0.0,
        };

        GazeReading::valid(Vector3::new(lateral, height, 0.0), self.direction(at))
    }
}
