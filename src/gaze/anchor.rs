//! Visual gaze markers
//!
//! Anchors are the objects placed at each computed gaze point. Rendering is
//! somebody else's problem; `Marker` just records where it was put.

use crate::gaze::types::Vector3;

/// Something that can be shown, hidden and moved to a gaze point
pub trait GazeAnchor: Send {
    fn set_active(&mut self, active: bool);

    /// Absolute (world space) position
    fn set_position(&mut self, position: Vector3);

    /// Offset relative to the parent rig
    fn set_local_position(&mut self, position: Vector3);
}

/// In-memory anchor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Marker {
    pub name: String,
    pub active: bool,
    pub position: Option<Vector3>,
    pub local_position: Option<Vector3>,
    pub updates: u64,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl GazeAnchor for Marker {
    fn set_active(&mut self, active: bool) {
        if self.active != active {
            tracing::trace!("Marker {} active={}", self.name, active);
        }
        self.active = active;
    }

    fn set_position(&mut self, position: Vector3) {
        self.position = Some(position);
        self.updates += 1;
    }

    fn set_local_position(&mut self, position: Vector3) {
        self.local_position = Some(position);
        self.updates += 1;
    }
}

impl<A: GazeAnchor + ?Sized> GazeAnchor for Box<A> {
    fn set_active(&mut self, active: bool) {
        (**self).set_active(active)
    }

    fn set_position(&mut self, position: Vector3) {
        (**self).set_position(position)
    }

    fn set_local_position(&mut self, position: Vector3) {
        (**self).set_local_position(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_tracks_world_and_local_positions() {
        let mut marker = Marker::new("Combined");
        marker.set_position(Vector3::new(1.0, 2.0, 3.0));
        marker.set_active(true);

        assert!(marker.active);
        assert_eq!(marker.position, Some(Vector3::new(1.0, 2.0, 3.0)));
        assert!(marker.local_position.is_none());

        marker.set_local_position(Vector3::new(0.0, 0.0, 1.5));
        marker.set_active(false);
        assert!(!marker.active);
        assert_eq!(marker.updates, 2);
    }

    #[test]
    fn test_boxed_anchor_delegates() {
        let mut boxed: Box<Marker> = Box::new(Marker::new("Left"));
        GazeAnchor::set_active(&mut boxed, true);
        assert!(boxed.active);
    }
}
