// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for camera paths.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeId(pub Uuid);

impl KeyframeId {
    /// Create a new random keyframe ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Rigid pose: position and orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position
    pub position: Vec3,
    /// Unit orientation
    pub rotation: Quat,
}

impl Pose {
    /// Pose at the origin with no rotation
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a pose
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A pose plus zoom, as produced by evaluating a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    /// Path-local position
    pub position: Vec3,
    /// Path-local rotation
    pub rotation: Quat,
    /// Zoom
    pub zoom: f32,
}

impl PathSample {
    /// Position and rotation without the zoom
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }
}

/// One timed camera sample on a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Unique keyframe ID
    pub id: KeyframeId,
    /// Path-local position
    pub position: Vec3,
    /// Path-local orientation
    pub rotation: Quat,
    /// Zoom at this sample
    pub zoom: f32,
    /// Time in seconds (path time, before time scaling)
    pub time: f32,
}

impl Keyframe {
    /// Create a new keyframe
    pub fn new(pose: Pose, zoom: f32, time: f32) -> Self {
        Self {
            id: KeyframeId::new(),
            position: pose.position,
            rotation: pose.rotation.normalize(),
            zoom,
            time,
        }
    }

    /// The keyframe pose
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// Overwrite every field except the ID
    pub fn set(&mut self, pose: Pose, zoom: f32, time: f32) {
        self.position = pose.position;
        self.rotation = pose.rotation.normalize();
        self.zoom = zoom;
        self.time = time;
    }

    /// The keyframe as an evaluated sample
    pub fn sample(&self) -> PathSample {
        PathSample {
            position: self.position,
            rotation: self.rotation,
            zoom: self.zoom,
        }
    }
}
