// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interfaces to the host: the tracked body, the camera rig and the clock.

use glam::{Quat, Vec3};

/// The moving body a path frame can be anchored to (e.g. a vehicle).
///
/// Sampled once per tick.
pub trait ReferenceBody {
    /// World position
    fn position(&self) -> Vec3;
    /// World rotation
    fn rotation(&self) -> Quat;
    /// Linear velocity in world space
    fn velocity(&self) -> Vec3;
}

/// The camera rig being driven.
pub trait RigHandle {
    /// World position
    fn position(&self) -> Vec3;
    /// World rotation
    fn rotation(&self) -> Quat;
    /// Current zoom
    fn zoom(&self) -> f32;
    /// Set world position
    fn set_position(&mut self, position: Vec3);
    /// Set world rotation
    fn set_rotation(&mut self, rotation: Quat);
    /// Set zoom
    fn set_zoom(&mut self, zoom: f32);

    /// Called when the rig is parented into a path frame
    fn attach(&mut self) {}

    /// Called when the rig leaves the path frame
    fn detach(&mut self) {}
}

/// Simulation time source
pub trait Clock {
    /// Monotonic time in seconds
    fn time(&self) -> f64;
    /// Duration of the current tick in seconds
    fn delta_time(&self) -> f32;
}

/// A clock advanced explicitly by the host
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimClock {
    time: f64,
    delta_time: f32,
}

impl SimClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick of `delta_time` seconds (negative deltas are ignored)
    pub fn advance(&mut self, delta_time: f32) {
        let delta_time = delta_time.max(0.0);
        self.delta_time = delta_time;
        self.time += delta_time as f64;
    }
}

impl Clock for SimClock {
    fn time(&self) -> f64 {
        self.time
    }

    fn delta_time(&self) -> f32 {
        self.delta_time
    }
}

/// A body with explicitly set state, useful for hosts without physics and for tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticBody {
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Linear velocity
    pub velocity: Vec3,
}

impl StaticBody {
    /// Body at the origin, at rest
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
        }
    }

    /// Move the body along its velocity for one tick
    pub fn integrate(&mut self, delta_time: f32) {
        self.position += self.velocity * delta_time;
    }
}

impl Default for StaticBody {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceBody for StaticBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }
}

/// Plain rig state without any scene graph behind it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigState {
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Zoom
    pub zoom: f32,
    /// Whether the rig is parented into a path frame
    pub attached: bool,
}

impl Default for RigState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            zoom: 1.0,
            attached: false,
        }
    }
}

impl RigHandle for RigState {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    fn attach(&mut self) {
        self.attached = true;
    }

    fn detach(&mut self) {
        self.attached = false;
    }
}
