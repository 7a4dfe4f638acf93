// SPDX-License-Identifier: MIT OR Apache-2.0
//! Path-local reference frame.
//!
//! The frame is a rigid transform (no scale) rooted at the reference body.
//! How it is refreshed each tick depends on the path's [`FramePolicy`]:
//! - fixed position: the root is re-read from the body
//! - free position: the root is the body position plus an offset that
//!   integrates the negative body velocity, cancelling the body's motion
//! - fixed rotation: the rotation is re-read from the body
//! - free rotation: the rotation captured at the start is kept

use crate::keyframe::Pose;
use crate::path::FramePolicy;
use crate::rig::ReferenceBody;
use glam::{Affine3A, Quat, Vec3};

/// Rigid transform between path-local space and world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    root_position: Vec3,
    root_rotation: Quat,
    accumulated_offset: Vec3,
    local_to_world: Affine3A,
    world_to_local: Affine3A,
}

impl FrameTransform {
    /// Frame rooted at the world origin
    pub fn new() -> Self {
        Self::from_root(Vec3::ZERO, Quat::IDENTITY)
    }

    /// Frame rooted at the given pose
    pub fn from_root(position: Vec3, rotation: Quat) -> Self {
        let mut frame = Self {
            root_position: position,
            root_rotation: rotation,
            accumulated_offset: Vec3::ZERO,
            local_to_world: Affine3A::IDENTITY,
            world_to_local: Affine3A::IDENTITY,
        };
        frame.recompute();
        frame
    }

    /// Frame rooted at the body's current pose, with no drift offset
    pub fn capture(body: &impl ReferenceBody) -> Self {
        Self::from_root(body.position(), body.rotation())
    }

    fn recompute(&mut self) {
        self.local_to_world = Affine3A::from_rotation_translation(self.root_rotation, self.root_position);
        self.world_to_local = self.local_to_world.inverse();
    }

    /// Move the root and recompute both transforms
    pub fn set_root(&mut self, position: Vec3, rotation: Quat) {
        self.root_position = position;
        self.root_rotation = rotation;
        self.recompute();
    }

    /// Re-read position and rotation from the body
    pub fn follow(&mut self, body: &impl ReferenceBody) {
        self.set_root(body.position(), body.rotation());
    }

    /// Refresh the root for one tick of `delta_time` seconds
    pub fn refresh(&mut self, policy: FramePolicy, body: &impl ReferenceBody, delta_time: f32) {
        let position = if policy.fixes_position() {
            body.position()
        } else {
            self.accumulated_offset -= body.velocity() * delta_time;
            body.position() + self.accumulated_offset
        };

        let rotation = if policy.fixes_rotation() {
            body.rotation()
        } else {
            self.root_rotation
        };

        self.set_root(position, rotation);
    }

    /// Root translation
    pub fn root_position(&self) -> Vec3 {
        self.root_position
    }

    /// Root rotation
    pub fn root_rotation(&self) -> Quat {
        self.root_rotation
    }

    /// Drift integrated while the position is not fixed
    pub fn accumulated_offset(&self) -> Vec3 {
        self.accumulated_offset
    }

    /// Path-local to world transform
    pub fn local_to_world(&self) -> Affine3A {
        self.local_to_world
    }

    /// World to path-local transform
    pub fn world_to_local(&self) -> Affine3A {
        self.world_to_local
    }

    /// Map a path-local pose into world space
    pub fn to_world(&self, local: Pose) -> Pose {
        Pose::new(
            self.local_to_world.transform_point3(local.position),
            (self.root_rotation * local.rotation).normalize(),
        )
    }

    /// Map a world pose into path-local space
    pub fn to_local(&self, world: Pose) -> Pose {
        Pose::new(
            self.world_to_local.transform_point3(world.position),
            (self.root_rotation.inverse() * world.rotation).normalize(),
        )
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::StaticBody;

    fn moving_body() -> StaticBody {
        StaticBody {
            position: Vec3::new(100.0, 0.0, -50.0),
            rotation: Quat::from_rotation_y(0.3),
            velocity: Vec3::new(4.0, 0.0, 2.0),
        }
    }

    #[test]
    fn test_round_trip() {
        let frame = FrameTransform::from_root(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(1.1));
        let local = Pose::new(Vec3::new(-4.0, 0.5, 9.0), Quat::from_rotation_x(0.4));
        let back = frame.to_local(frame.to_world(local));
        assert!(back.position.abs_diff_eq(local.position, 1e-4));
        assert!(back.rotation.abs_diff_eq(local.rotation, 1e-5));
    }

    #[test]
    fn test_inverse_consistent() {
        let frame = FrameTransform::from_root(Vec3::new(-3.0, 7.0, 0.5), Quat::from_rotation_x(2.0));
        let product = frame.local_to_world() * frame.world_to_local();
        assert!(product.abs_diff_eq(Affine3A::IDENTITY, 1e-5));
    }

    #[test]
    fn test_fixed_frame_tracks_body() {
        let mut body = moving_body();
        let mut frame = FrameTransform::capture(&body);
        for tick in 0..20 {
            body.integrate(0.02);
            body.rotation = Quat::from_rotation_y(0.3 + tick as f32 * 0.01);
            frame.refresh(FramePolicy::FixPositionAndRotation, &body, 0.02);
            assert_eq!(frame.root_position(), body.position);
            assert_eq!(frame.root_rotation(), body.rotation);
        }
        assert_eq!(frame.accumulated_offset(), Vec3::ZERO);
    }

    #[test]
    fn test_free_frame_drifts_against_velocity() {
        // Body reports a fixed position while moving, as after an origin shift
        let mut body = moving_body();
        let start = body.position;
        let captured_rotation = body.rotation;
        let mut frame = FrameTransform::capture(&body);

        let dt = 0.02;
        let ticks = 50;
        for _ in 0..ticks {
            body.rotation = body.rotation * Quat::from_rotation_x(0.05);
            frame.refresh(FramePolicy::Free, &body, dt);
            assert_eq!(frame.root_rotation(), captured_rotation);
        }

        let expected = start - body.velocity * dt * ticks as f32;
        assert!(frame.root_position().abs_diff_eq(expected, 1e-3));
    }

    #[test]
    fn test_free_frame_cancels_body_motion() {
        let mut body = moving_body();
        let start = body.position;
        let mut frame = FrameTransform::capture(&body);
        for _ in 0..100 {
            body.integrate(0.01);
            frame.refresh(FramePolicy::FixRotation, &body, 0.01);
        }
        assert!(frame.root_position().abs_diff_eq(start, 1e-2));
    }
}
