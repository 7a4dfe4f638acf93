// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame-relative path playback.
//!
//! This module handles:
//! - Arming a rig into a path frame for keyframe editing
//! - Starting and stopping playback
//! - Refreshing the path frame from the reference body each tick
//! - Rubber-band following of the evaluated path pose
//!
//! Smoothing happens in path-local space, so the rig is pulled toward the
//! path's shape even while the frame itself moves under the body.

use crate::curve::Interpolate;
use crate::frame::FrameTransform;
use crate::keyframe::{Keyframe, Pose};
use crate::path::{Path, PathError};
use crate::rig::{ReferenceBody, RigHandle};
use crate::settings::RigSettings;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not attached to a rig
    #[default]
    Idle,
    /// Rig parented into the path frame, clock not running
    Armed,
    /// Clock running, pose applied every tick
    Playing,
}

impl PlaybackState {
    /// Check if a rig is attached (armed or playing)
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Armed | PlaybackState::Playing)
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// Get a status string for display
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Armed => "Armed",
            PlaybackState::Playing => "Playing",
        }
    }
}

/// Error from playback operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    /// Path has no keyframes
    #[error("Cannot play a path with no keyframes")]
    EmptyPath,

    /// Operation needs an armed rig
    #[error("Rig is not armed")]
    NotArmed,

    /// Playback already running
    #[error("Playback already running")]
    AlreadyPlaying,

    /// Path evaluation failed
    #[error("Path error: {0}")]
    Path(#[from] PathError),
}

/// Drives a camera rig along a path
#[derive(Debug, Clone)]
pub struct PathPlayer {
    /// Current state
    state: PlaybackState,
    /// Path-local to world frame
    frame: FrameTransform,
    /// Seconds since playback started
    elapsed: f32,
    /// Stop once the last keyframe is passed
    pub stop_at_end: bool,
}

impl PathPlayer {
    /// Create an idle player
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            frame: FrameTransform::new(),
            elapsed: 0.0,
            stop_at_end: false,
        }
    }

    /// Create an idle player using the configured playback options
    pub fn with_settings(settings: &RigSettings) -> Self {
        Self {
            stop_at_end: settings.stop_at_end,
            ..Self::new()
        }
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current frame
    pub fn frame(&self) -> &FrameTransform {
        &self.frame
    }

    /// Seconds since playback started
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Whether the clock has passed the path's last keyframe
    pub fn is_finished(&self, path: &Path) -> bool {
        self.state.is_playing() && self.elapsed >= path.duration()
    }

    /// Parent the rig into a frame rooted at the body
    pub fn arm(&mut self, body: &impl ReferenceBody, rig: &mut impl RigHandle) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Idle => {
                self.frame = FrameTransform::capture(body);
                self.elapsed = 0.0;
                rig.attach();
                self.state = PlaybackState::Armed;
                tracing::info!("Armed path camera");
                Ok(())
            }
            PlaybackState::Armed => Ok(()),
            PlaybackState::Playing => Err(PlaybackError::AlreadyPlaying),
        }
    }

    /// Start playback from the beginning of the path.
    ///
    /// On failure the state is left unchanged.
    pub fn play(
        &mut self,
        path: &Path,
        body: &impl ReferenceBody,
        rig: &mut impl RigHandle,
    ) -> Result<(), PlaybackError> {
        if self.state.is_playing() {
            return Err(PlaybackError::AlreadyPlaying);
        }
        if path.is_empty() {
            return Err(PlaybackError::EmptyPath);
        }
        let start = path.evaluate(0.0)?;

        self.frame = FrameTransform::capture(body);
        let world = self.frame.to_world(start.pose());
        rig.set_position(world.position);
        rig.set_rotation(world.rotation);
        rig.set_zoom(start.zoom);

        if self.state == PlaybackState::Idle {
            rig.attach();
        }
        self.elapsed = 0.0;
        self.state = PlaybackState::Playing;
        tracing::info!(
            "Playing path '{}' ({} keyframes, {:?})",
            path.name,
            path.keyframe_count(),
            path.frame_policy
        );
        Ok(())
    }

    /// Detach the rig, leaving it at its last pose.
    /// Returns false if already idle.
    pub fn stop(&mut self, rig: &mut impl RigHandle) -> bool {
        if !self.state.is_active() {
            return false;
        }
        rig.detach();
        self.state = PlaybackState::Idle;
        self.elapsed = 0.0;
        tracing::info!("Stopped path camera");
        true
    }

    /// Advance one tick of `delta_time` seconds
    pub fn update(
        &mut self,
        delta_time: f32,
        path: &Path,
        body: &impl ReferenceBody,
        rig: &mut impl RigHandle,
    ) -> Result<(), PlaybackError> {
        let delta_time = delta_time.max(0.0);
        match self.state {
            PlaybackState::Idle => Ok(()),
            PlaybackState::Armed => {
                // Carry the rig along with the body
                let local = self.local_pose(rig);
                self.frame.follow(body);
                let world = self.frame.to_world(local);
                rig.set_position(world.position);
                rig.set_rotation(world.rotation);
                Ok(())
            }
            PlaybackState::Playing => self.step(delta_time, path, body, rig),
        }
    }

    fn step(
        &mut self,
        delta_time: f32,
        path: &Path,
        body: &impl ReferenceBody,
        rig: &mut impl RigHandle,
    ) -> Result<(), PlaybackError> {
        if path.is_empty() {
            tracing::warn!("Path '{}' lost its keyframes during playback", path.name);
            self.stop(rig);
            return Err(PlaybackError::EmptyPath);
        }

        // Committed only once the path has been sampled
        let elapsed = self.elapsed + delta_time;
        let mut frame = self.frame;
        frame.refresh(path.frame_policy, body, delta_time);

        let target = match path.evaluate(elapsed) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!("Skipping path tick at t={}: {}", elapsed, e);
                return Err(e.into());
            }
        };
        self.elapsed = elapsed;
        self.frame = frame;

        let current = self.local_pose(rig);
        let factor = (path.interpolation_rate * delta_time).clamp(0.0, 1.0);
        let local = Pose::new(
            current.position.lerp(target.position, factor),
            current.rotation.slerp(target.rotation, factor),
        );
        let zoom = f32::interpolate(rig.zoom(), target.zoom, factor);

        let world = self.frame.to_world(local);
        rig.set_position(world.position);
        rig.set_rotation(world.rotation);
        rig.set_zoom(zoom);

        if self.stop_at_end && self.elapsed >= path.duration() {
            tracing::info!("Path '{}' finished", path.name);
            self.stop(rig);
        }
        Ok(())
    }

    /// The rig's pose expressed in path-local space
    pub fn local_pose(&self, rig: &impl RigHandle) -> Pose {
        self.frame.to_local(Pose::new(rig.position(), rig.rotation()))
    }

    /// Snap the rig to a keyframe's pose for editing
    pub fn preview_keyframe(&self, keyframe: &Keyframe, rig: &mut impl RigHandle) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Armed {
            return Err(PlaybackError::NotArmed);
        }
        let world = self.frame.to_world(keyframe.pose());
        rig.set_position(world.position);
        rig.set_rotation(world.rotation);
        rig.set_zoom(keyframe.zoom);
        Ok(())
    }
}

impl Default for PathPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FramePolicy;
    use crate::rig::{RigState, StaticBody};
    use glam::{Quat, Vec3};

    fn dolly(policy: FramePolicy) -> Path {
        let mut path = Path::new("Dolly");
        path.frame_policy = policy;
        path.interpolation_rate = 10.0;
        path.add_keyframe(Pose::new(Vec3::new(0.0, 2.0, -5.0), Quat::IDENTITY), 1.0, 0.0)
            .unwrap();
        path.add_keyframe(
            Pose::new(Vec3::new(0.0, 2.0, 5.0), Quat::from_rotation_y(1.0)),
            3.0,
            2.0,
        )
        .unwrap();
        path
    }

    fn body_at(position: Vec3, rotation: Quat) -> StaticBody {
        StaticBody {
            position,
            rotation,
            velocity: Vec3::ZERO,
        }
    }

    #[test]
    fn test_play_empty_path_stays_idle() {
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();
        let result = player.play(&Path::new("Empty"), &StaticBody::new(), &mut rig);
        assert_eq!(result, Err(PlaybackError::EmptyPath));
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!rig.attached);
    }

    #[test]
    fn test_play_snaps_to_first_keyframe() {
        let body = body_at(Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let path = dolly(FramePolicy::FixPositionAndRotation);
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();

        player.play(&path, &body, &mut rig).unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
        assert!(rig.attached);
        assert_eq!(rig.zoom, 1.0);

        let expected = body.position + body.rotation * Vec3::new(0.0, 2.0, -5.0);
        assert!(rig.position.abs_diff_eq(expected, 1e-4));
        assert!(player.local_pose(&rig).position.abs_diff_eq(Vec3::new(0.0, 2.0, -5.0), 1e-4));
    }

    #[test]
    fn test_fixed_policy_tracks_body_each_tick() {
        let mut body = StaticBody {
            position: Vec3::new(0.0, 100.0, 0.0),
            rotation: Quat::IDENTITY,
            velocity: Vec3::new(0.0, 0.0, 30.0),
        };
        let path = dolly(FramePolicy::FixPositionAndRotation);
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();
        player.play(&path, &body, &mut rig).unwrap();

        for tick in 0..30 {
            body.integrate(0.02);
            body.rotation = Quat::from_rotation_z(tick as f32 * 0.03);
            player.update(0.02, &path, &body, &mut rig).unwrap();
            assert_eq!(player.frame().root_position(), body.position);
            assert_eq!(player.frame().root_rotation(), body.rotation);
        }
    }

    #[test]
    fn test_free_policy_keeps_start_rotation() {
        let mut body = body_at(Vec3::ZERO, Quat::from_rotation_x(0.2));
        body.velocity = Vec3::new(1.0, 0.0, 0.0);
        let start_rotation = body.rotation;
        let path = dolly(FramePolicy::Free);
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();
        player.play(&path, &body, &mut rig).unwrap();

        for _ in 0..10 {
            body.rotation = body.rotation * Quat::from_rotation_y(0.1);
            player.update(0.1, &path, &body, &mut rig).unwrap();
        }
        assert_eq!(player.frame().root_rotation(), start_rotation);
        assert!(player
            .frame()
            .root_position()
            .abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn test_fix_position_keeps_start_rotation() {
        let mut body = body_at(Vec3::new(0.0, 50.0, 0.0), Quat::from_rotation_y(0.4));
        body.velocity = Vec3::new(0.0, 0.0, 20.0);
        let start_rotation = body.rotation;
        let path = dolly(FramePolicy::FixPosition);
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();
        player.play(&path, &body, &mut rig).unwrap();

        for _ in 0..25 {
            body.integrate(0.04);
            body.rotation = body.rotation * Quat::from_rotation_x(0.05);
            player.update(0.04, &path, &body, &mut rig).unwrap();
            assert_eq!(player.frame().root_position(), body.position);
            assert_eq!(player.frame().root_rotation(), start_rotation);
        }
        assert_eq!(player.frame().accumulated_offset(), Vec3::ZERO);

        // Path held at its last keyframe, expressed in the unrotated frame
        for _ in 0..100 {
            player.update(0.04, &path, &body, &mut rig).unwrap();
        }
        let expected = body.position + start_rotation * Vec3::new(0.0, 2.0, 5.0);
        assert!(rig.position.abs_diff_eq(expected, 1e-3));
    }

    #[test]
    fn test_failed_tick_leaves_clock_and_frame() {
        let mut body = StaticBody {
            velocity: Vec3::new(5.0, 0.0, 0.0),
            ..StaticBody::new()
        };
        let mut path = dolly(FramePolicy::FixPosition);
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();
        player.play(&path, &body, &mut rig).unwrap();
        body.integrate(0.1);
        player.update(0.1, &path, &body, &mut rig).unwrap();

        let elapsed = player.elapsed();
        let frame = *player.frame();
        let before = rig;

        // A NaN clock has no interval to sample
        path.time_scale = f32::NAN;
        body.integrate(0.1);
        assert!(matches!(
            player.update(0.1, &path, &body, &mut rig),
            Err(PlaybackError::Path(_))
        ));
        assert_eq!(player.elapsed(), elapsed);
        assert_eq!(*player.frame(), frame);
        assert_eq!(rig, before);
        assert!(player.state().is_playing());
    }

    #[test]
    fn test_smoothing_converges_monotonically() {
        let body = body_at(Vec3::new(3.0, -1.0, 7.0), Quat::from_rotation_y(0.7));
        let mut path = Path::new("Hold");
        path.interpolation_rate = 5.0;
        let target = Pose::new(Vec3::new(4.0, 1.0, -2.0), Quat::from_rotation_x(0.5));
        path.add_keyframe(target, 2.0, 0.0).unwrap();

        let mut player = PathPlayer::new();
        let mut rig = RigState::default();
        player.play(&path, &body, &mut rig).unwrap();

        // Operator knocks the rig away from the path
        rig.position += Vec3::new(20.0, -6.0, 3.0);
        rig.rotation = Quat::from_rotation_z(2.0) * rig.rotation;
        rig.zoom = 6.0;

        let mut last_distance = f32::INFINITY;
        let mut last_angle = f32::INFINITY;
        for _ in 0..200 {
            player.update(0.02, &path, &body, &mut rig).unwrap();
            let local = player.local_pose(&rig);
            let distance = local.position.distance(target.position);
            let angle = local.rotation.angle_between(target.rotation);
            assert!(distance <= last_distance + 1e-4);
            // acos near 1 is noisy in f32
            assert!(angle <= last_angle + 1e-3);
            last_distance = distance;
            last_angle = angle;
        }
        assert!(last_distance < 1e-3);
        assert!(last_angle < 1e-2);
        assert!((rig.zoom - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_armed_rig_rides_with_body() {
        let mut body = body_at(Vec3::ZERO, Quat::IDENTITY);
        let path = Path::new("Recording");
        let mut player = PathPlayer::new();
        let mut rig = RigState {
            position: Vec3::new(0.0, 0.0, 4.0),
            ..RigState::default()
        };
        player.arm(&body, &mut rig).unwrap();
        assert_eq!(player.state(), PlaybackState::Armed);

        body.position = Vec3::new(10.0, 0.0, 0.0);
        player.update(0.02, &path, &body, &mut rig).unwrap();
        assert!(rig.position.abs_diff_eq(Vec3::new(10.0, 0.0, 4.0), 1e-5));
        assert!(player.local_pose(&rig).position.abs_diff_eq(Vec3::new(0.0, 0.0, 4.0), 1e-5));
    }

    #[test]
    fn test_preview_keyframe_requires_arm() {
        let body = body_at(Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY);
        let path = dolly(FramePolicy::Free);
        let keyframe = path.keyframe_at(1).unwrap();
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();

        assert_eq!(player.preview_keyframe(keyframe, &mut rig), Err(PlaybackError::NotArmed));
        player.arm(&body, &mut rig).unwrap();
        player.preview_keyframe(keyframe, &mut rig).unwrap();
        assert!(rig.position.abs_diff_eq(Vec3::new(0.0, 7.0, 5.0), 1e-5));
        assert_eq!(rig.zoom, 3.0);
    }

    #[test]
    fn test_emptied_path_aborts_to_idle() {
        let body = StaticBody::new();
        let mut path = dolly(FramePolicy::Free);
        let mut player = PathPlayer::new();
        let mut rig = RigState::default();
        player.play(&path, &body, &mut rig).unwrap();

        let ids: Vec<_> = path.keyframes().iter().map(|k| k.id).collect();
        for id in ids {
            path.remove_keyframe(id).unwrap();
        }
        assert_eq!(player.update(0.02, &path, &body, &mut rig), Err(PlaybackError::EmptyPath));
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!rig.attached);
    }

    #[test]
    fn test_stop_at_end() {
        let body = StaticBody::new();
        let path = dolly(FramePolicy::FixPositionAndRotation);
        let mut player = PathPlayer::with_settings(&RigSettings {
            stop_at_end: true,
            ..RigSettings::default()
        });
        let mut rig = RigState::default();
        player.play(&path, &body, &mut rig).unwrap();

        for _ in 0..19 {
            player.update(0.1, &path, &body, &mut rig).unwrap();
        }
        assert!(player.state().is_playing());
        player.update(0.15, &path, &body, &mut rig).unwrap();
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.stop(&mut rig));
    }
}
