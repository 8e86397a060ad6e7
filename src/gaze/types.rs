use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul};

/// Distance along the gaze ray at which anchors are placed.
pub const LOOK_AHEAD_DISTANCE: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero-length input
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Mul<Vector3> for f32 {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self * rhs.x, self * rhs.y, self * rhs.z)
    }
}

/// Which eye a provider query is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
    Combined,
}

/// Coordinate space of a provider query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuerySpace {
    /// World coordinates
    World,
    /// Relative to the head-mounted camera rig
    Camera,
}

/// The four readings logged every frame, in logging order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GazeType {
    Left,
    Right,
    Combined,
    CameraRelativeCombined,
}

impl GazeType {
    pub const ALL: [GazeType; 4] = [
        GazeType::Left,
        GazeType::Right,
        GazeType::Combined,
        GazeType::CameraRelativeCombined,
    ];

    /// Provider query issued for this gaze type
    pub fn query(&self) -> (Eye, QuerySpace) {
        match self {
            GazeType::Left => (Eye::Left, QuerySpace::World),
            GazeType::Right => (Eye::Right, QuerySpace::World),
            GazeType::Combined => (Eye::Combined, QuerySpace::World),
            GazeType::CameraRelativeCombined => (Eye::Combined, QuerySpace::Camera),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            GazeType::Left => 0,
            GazeType::Right => 1,
            GazeType::Combined => 2,
            GazeType::CameraRelativeCombined => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GazeType::Left => "Left",
            GazeType::Right => "Right",
            GazeType::Combined => "Combined",
            GazeType::CameraRelativeCombined => "CameraRelativeCombined",
        }
    }
}

impl fmt::Display for GazeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sample from the eye tracker.
///
/// `eye_position` and `gaze_direction` are only meaningful when `is_valid`
/// is set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazeReading {
    pub is_valid: bool,
    pub eye_position: Vector3,
    pub gaze_direction: Vector3,
}

impl GazeReading {
    pub fn valid(eye_position: Vector3, gaze_direction: Vector3) -> Self {
        Self {
            is_valid: true,
            eye_position,
            gaze_direction,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    /// Point projected `LOOK_AHEAD_DISTANCE` along the gaze ray
    pub fn anchor_point(&self) -> Option<Vector3> {
        self.is_valid
            .then(|| self.eye_position + LOOK_AHEAD_DISTANCE * self.gaze_direction)
    }
}
