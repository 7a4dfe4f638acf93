// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera context: path library, active behavior and playback.
//!
//! One context drives one rig. The host owns it and passes the reference
//! body, rig and clock into each call.

use crate::behavior::CameraBehavior;
use crate::keyframe::KeyframeId;
use crate::path::{Path, PathError, PathId};
use crate::playback::{PathPlayer, PlaybackError, PlaybackState};
use crate::rig::{Clock, ReferenceBody, RigHandle};
use crate::settings::RigSettings;
use crate::storage::{self, StorageError};
use indexmap::IndexMap;

/// Error from context operations
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// No path is selected
    #[error("No camera path selected")]
    NoCurrentPath,

    /// Path not found
    #[error("Path not found: {0:?}")]
    PathNotFound(PathId),

    /// The library cannot be replaced while a rig is attached
    #[error("Rig is attached to a path")]
    Busy,

    /// Path error
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Playback error
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Everything needed to drive one camera rig
#[derive(Debug, Clone)]
pub struct CameraContext {
    /// Settings, kept in sync with the player
    settings: RigSettings,
    /// Path library, in creation order
    paths: IndexMap<PathId, Path>,
    /// Selected path
    current: Option<PathId>,
    /// Active behavior
    behavior: CameraBehavior,
    /// Path playback
    player: PathPlayer,
}

impl CameraContext {
    /// Create a context with an empty library
    pub fn new(settings: RigSettings) -> Self {
        let player = PathPlayer::with_settings(&settings);
        Self {
            settings,
            paths: IndexMap::new(),
            current: None,
            behavior: CameraBehavior::default(),
            player,
        }
    }

    /// Current settings
    pub fn settings(&self) -> &RigSettings {
        &self.settings
    }

    /// Replace the settings.
    ///
    /// New values apply to paths created and keyframes recorded afterwards,
    /// and to the running player.
    pub fn set_settings(&mut self, settings: RigSettings) {
        self.player.stop_at_end = settings.stop_at_end;
        self.settings = settings;
    }

    // Library

    /// Create an empty path and select it
    pub fn create_path(&mut self, name: impl Into<String>) -> PathId {
        let path = Path::with_settings(name, &self.settings);
        tracing::debug!("Created path '{}'", path.name);
        self.add_path(path)
    }

    /// Add an existing path and select it
    pub fn add_path(&mut self, path: Path) -> PathId {
        let id = path.id;
        self.paths.insert(id, path);
        self.current = Some(id);
        id
    }

    /// Remove a path, stopping playback if it was the selected one
    pub fn remove_path(&mut self, path_id: PathId, rig: &mut impl RigHandle) -> Result<Path, ContextError> {
        let path = self
            .paths
            .shift_remove(&path_id)
            .ok_or(ContextError::PathNotFound(path_id))?;
        if self.current == Some(path_id) {
            self.player.stop(rig);
            self.current = None;
        }
        tracing::debug!("Removed path '{}'", path.name);
        Ok(path)
    }

    /// Select a path, stopping playback of the previous one
    pub fn select_path(&mut self, path_id: PathId, rig: &mut impl RigHandle) -> Result<(), ContextError> {
        if !self.paths.contains_key(&path_id) {
            return Err(ContextError::PathNotFound(path_id));
        }
        if self.current != Some(path_id) {
            self.player.stop(rig);
            self.current = Some(path_id);
        }
        Ok(())
    }

    /// Selected path ID
    pub fn current_path_id(&self) -> Option<PathId> {
        self.current
    }

    /// Selected path
    pub fn current_path(&self) -> Option<&Path> {
        self.current.and_then(|id| self.paths.get(&id))
    }

    /// Selected path, mutable
    pub fn current_path_mut(&mut self) -> Option<&mut Path> {
        self.current.and_then(|id| self.paths.get_mut(&id))
    }

    fn require_current_mut(&mut self) -> Result<&mut Path, ContextError> {
        self.current
            .and_then(|id| self.paths.get_mut(&id))
            .ok_or(ContextError::NoCurrentPath)
    }

    /// Get a path
    pub fn path(&self, path_id: PathId) -> Option<&Path> {
        self.paths.get(&path_id)
    }

    /// All paths, in creation order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    /// Get path count
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    // Keyframe editing

    /// Record the rig's current pose as a new keyframe after the last one.
    ///
    /// The rig must be armed so the pose is taken relative to the path frame.
    pub fn record_keyframe(&mut self, rig: &impl RigHandle) -> Result<KeyframeId, ContextError> {
        if self.player.state() != PlaybackState::Armed {
            return Err(PlaybackError::NotArmed.into());
        }
        let pose = self.player.local_pose(rig);
        let zoom = self.settings.clamp_zoom(rig.zoom());
        let step = self.settings.keyframe_time_step;

        let path = self.require_current_mut()?;
        let time = path.next_keyframe_time(step);
        Ok(path.add_keyframe(pose, zoom, time)?)
    }

    /// Re-apply the rig's current pose to an existing keyframe, keeping its time
    pub fn update_keyframe(&mut self, keyframe_id: KeyframeId, rig: &impl RigHandle) -> Result<(), ContextError> {
        if self.player.state() != PlaybackState::Armed {
            return Err(PlaybackError::NotArmed.into());
        }
        let pose = self.player.local_pose(rig);
        let zoom = self.settings.clamp_zoom(rig.zoom());

        let path = self.require_current_mut()?;
        let time = path
            .keyframe(keyframe_id)
            .map(|k| k.time)
            .ok_or(PathError::KeyframeNotFound(keyframe_id))?;
        Ok(path.set_keyframe(keyframe_id, pose, zoom, time)?)
    }

    /// Move a keyframe to a new time
    pub fn retime_keyframe(&mut self, keyframe_id: KeyframeId, time: f32) -> Result<(), ContextError> {
        let path = self.require_current_mut()?;
        let keyframe = path
            .keyframe(keyframe_id)
            .ok_or(PathError::KeyframeNotFound(keyframe_id))?;
        let (pose, zoom) = (keyframe.pose(), keyframe.zoom);
        Ok(path.set_keyframe(keyframe_id, pose, zoom, time)?)
    }

    /// Delete a keyframe from the selected path
    pub fn remove_keyframe(&mut self, keyframe_id: KeyframeId) -> Result<(), ContextError> {
        self.require_current_mut()?.remove_keyframe(keyframe_id)?;
        Ok(())
    }

    /// Move the armed rig to a keyframe's pose
    pub fn preview_keyframe(&self, keyframe_id: KeyframeId, rig: &mut impl RigHandle) -> Result<(), ContextError> {
        let path = self.current_path().ok_or(ContextError::NoCurrentPath)?;
        let keyframe = path
            .keyframe(keyframe_id)
            .ok_or(PathError::KeyframeNotFound(keyframe_id))?;
        Ok(self.player.preview_keyframe(keyframe, rig)?)
    }

    // Playback

    /// Playback state
    pub fn playback_state(&self) -> PlaybackState {
        self.player.state()
    }

    /// The path player
    pub fn player(&self) -> &PathPlayer {
        &self.player
    }

    /// Arm the rig into the selected path's frame for editing
    pub fn start_path(&mut self, body: &impl ReferenceBody, rig: &mut impl RigHandle) -> Result<(), ContextError> {
        if self.current_path().is_none() {
            return Err(ContextError::NoCurrentPath);
        }
        self.player.arm(body, rig)?;
        self.behavior = CameraBehavior::Path;
        Ok(())
    }

    /// Play the selected path from the start
    pub fn play_path(&mut self, body: &impl ReferenceBody, rig: &mut impl RigHandle) -> Result<(), ContextError> {
        let path = self
            .current
            .and_then(|id| self.paths.get(&id))
            .ok_or(ContextError::NoCurrentPath)?;
        self.player.play(path, body, rig)?;
        self.behavior = CameraBehavior::Path;
        Ok(())
    }

    /// Stop path playback or editing.
    /// Returns false if nothing was attached.
    pub fn stop_path(&mut self, rig: &mut impl RigHandle) -> bool {
        self.player.stop(rig)
    }

    // Behaviors

    /// Active behavior
    pub fn behavior(&self) -> CameraBehavior {
        self.behavior
    }

    /// Switch behavior, detaching from the path when leaving it
    pub fn set_behavior(&mut self, behavior: CameraBehavior, rig: &mut impl RigHandle) {
        if behavior == self.behavior {
            return;
        }
        if self.behavior == CameraBehavior::Path {
            self.player.stop(rig);
        }
        tracing::debug!("Camera behavior: {} -> {}", self.behavior.name(), behavior.name());
        self.behavior = behavior;
    }

    /// Step to the next (or previous) behavior
    pub fn cycle_behavior(&mut self, forward: bool, rig: &mut impl RigHandle) -> CameraBehavior {
        let next = if forward {
            self.behavior.next()
        } else {
            self.behavior.previous()
        };
        self.set_behavior(next, rig);
        next
    }

    /// Advance one fixed simulation step
    pub fn fixed_update(
        &mut self,
        clock: &impl Clock,
        body: &impl ReferenceBody,
        rig: &mut impl RigHandle,
    ) -> Result<(), ContextError> {
        match self.behavior {
            CameraBehavior::Path => {
                let Some(path) = self.current.and_then(|id| self.paths.get(&id)) else {
                    self.player.stop(rig);
                    return Ok(());
                };
                self.player.update(clock.delta_time(), path, body, rig)?;
                Ok(())
            }
            // Driven by the host
            CameraBehavior::Stationary
            | CameraBehavior::LookAt
            | CameraBehavior::FollowBody
            | CameraBehavior::Free
            | CameraBehavior::ConstantMovement => Ok(()),
        }
    }

    // Persistence

    /// Replace the library with the paths stored in a file.
    /// Returns the number of paths loaded.
    pub fn load_library(&mut self, file: &std::path::Path) -> Result<usize, ContextError> {
        if self.player.state().is_active() {
            return Err(ContextError::Busy);
        }
        let paths = storage::load_library(file, self.settings.default_frame_policy)?;
        self.paths = paths.into_iter().map(|p| (p.id, p)).collect();
        self.current = self.paths.keys().next().copied();
        Ok(self.paths.len())
    }

    /// Write every path to a file
    pub fn save_library(&self, file: &std::path::Path) -> Result<(), ContextError> {
        storage::save_library(file, self.paths.values())?;
        Ok(())
    }
}

impl Default for CameraContext {
    fn default() -> Self {
        Self::new(RigSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::{RigState, StaticBody};
    use glam::Vec3;

    #[test]
    fn test_record_requires_armed_rig() {
        let mut ctx = CameraContext::default();
        ctx.create_path("Intro");
        let rig = RigState::default();
        assert!(matches!(
            ctx.record_keyframe(&rig),
            Err(ContextError::Playback(PlaybackError::NotArmed))
        ));
    }

    #[test]
    fn test_record_uses_time_step_and_zoom_clamp() {
        let mut ctx = CameraContext::new(RigSettings {
            keyframe_time_step: 2.0,
            ..RigSettings::default()
        });
        ctx.create_path("Intro");
        let body = StaticBody {
            position: Vec3::new(5.0, 0.0, 0.0),
            ..StaticBody::new()
        };
        let mut rig = RigState {
            position: Vec3::new(5.0, 1.0, 0.0),
            zoom: 12.0,
            ..RigState::default()
        };
        ctx.start_path(&body, &mut rig).unwrap();

        ctx.record_keyframe(&rig).unwrap();
        rig.position.z = 3.0;
        ctx.record_keyframe(&rig).unwrap();

        let path = ctx.current_path().unwrap();
        assert_eq!(path.keyframe_count(), 2);
        assert_eq!(path.keyframe_at(0).unwrap().time, 0.0);
        assert_eq!(path.keyframe_at(1).unwrap().time, 2.0);
        assert_eq!(path.keyframe_at(0).unwrap().zoom, 8.0);
        assert!(path
            .keyframe_at(1)
            .unwrap()
            .position
            .abs_diff_eq(Vec3::new(0.0, 1.0, 3.0), 1e-5));
    }

    #[test]
    fn test_play_without_path() {
        let mut ctx = CameraContext::default();
        let mut rig = RigState::default();
        assert!(matches!(
            ctx.play_path(&StaticBody::new(), &mut rig),
            Err(ContextError::NoCurrentPath)
        ));
        assert_eq!(ctx.playback_state(), PlaybackState::Idle);
    }

    #[test]
    fn test_leaving_path_behavior_stops_playback() {
        let mut ctx = CameraContext::default();
        let mut rig = RigState::default();
        let body = StaticBody::new();
        ctx.create_path("Intro");
        ctx.current_path_mut()
            .unwrap()
            .add_keyframe(crate::keyframe::Pose::IDENTITY, 1.0, 0.0)
            .unwrap();

        ctx.play_path(&body, &mut rig).unwrap();
        assert_eq!(ctx.behavior(), CameraBehavior::Path);
        assert_eq!(ctx.cycle_behavior(true, &mut rig), CameraBehavior::LookAt);
        assert_eq!(ctx.playback_state(), PlaybackState::Idle);
        assert!(!rig.attached);
    }

    #[test]
    fn test_settings_change_reaches_player() {
        let mut ctx = CameraContext::default();
        let body = StaticBody::new();
        let mut rig = RigState::default();
        let path = ctx.create_path("Short");
        let path = ctx.paths.get_mut(&path).unwrap();
        path.add_keyframe(crate::keyframe::Pose::IDENTITY, 1.0, 0.0).unwrap();
        path.add_keyframe(crate::keyframe::Pose::IDENTITY, 2.0, 1.0).unwrap();

        let settings = RigSettings {
            stop_at_end: true,
            ..ctx.settings().clone()
        };
        ctx.set_settings(settings);
        assert!(ctx.settings().stop_at_end);

        ctx.play_path(&body, &mut rig).unwrap();
        let mut clock = crate::rig::SimClock::new();
        for _ in 0..50 {
            clock.advance(0.1);
            ctx.fixed_update(&clock, &body, &mut rig).unwrap();
        }
        assert_eq!(ctx.playback_state(), PlaybackState::Idle);
        assert!(!rig.attached);
    }

    #[test]
    fn test_remove_selected_path() {
        let mut ctx = CameraContext::default();
        let mut rig = RigState::default();
        let first = ctx.create_path("A");
        let second = ctx.create_path("B");
        assert_eq!(ctx.current_path_id(), Some(second));

        ctx.select_path(first, &mut rig).unwrap();
        ctx.remove_path(first, &mut rig).unwrap();
        assert_eq!(ctx.current_path_id(), None);
        assert_eq!(ctx.path_count(), 1);
        assert!(matches!(
            ctx.select_path(first, &mut rig),
            Err(ContextError::PathNotFound(_))
        ));
    }
}
