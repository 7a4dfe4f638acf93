// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera path: ordered keyframes plus the curves derived from them.

use crate::curve::{Curve, CurveError, CurveMode};
use crate::keyframe::{Keyframe, KeyframeId, PathSample, Pose};
use crate::settings::RigSettings;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use uuid::Uuid;

/// Unique identifier for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathId(pub Uuid);

impl PathId {
    /// Create a new random path ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PathId {
    fn default() -> Self {
        Self::new()
    }
}

/// How the path-local frame tracks the reference body during playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FramePolicy {
    /// Neither position nor rotation follow the body
    #[default]
    Free,
    /// Frame position follows the body
    FixPosition,
    /// Frame rotation follows the body
    FixRotation,
    /// Frame follows the body rigidly
    FixPositionAndRotation,
}

impl FramePolicy {
    const POSITION_BIT: u8 = 0b01;
    const ROTATION_BIT: u8 = 0b10;

    /// All policies, in bit order
    pub const ALL: [FramePolicy; 4] = [
        FramePolicy::Free,
        FramePolicy::FixPosition,
        FramePolicy::FixRotation,
        FramePolicy::FixPositionAndRotation,
    ];

    /// Bit representation
    pub fn bits(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::FixPosition => Self::POSITION_BIT,
            Self::FixRotation => Self::ROTATION_BIT,
            Self::FixPositionAndRotation => Self::POSITION_BIT | Self::ROTATION_BIT,
        }
    }

    /// Policy from its bit representation (extra bits are ignored)
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & (Self::POSITION_BIT | Self::ROTATION_BIT)) as usize]
    }

    /// Whether the frame position is re-read from the body every tick
    pub fn fixes_position(&self) -> bool {
        self.bits() & Self::POSITION_BIT != 0
    }

    /// Whether the frame rotation is re-read from the body every tick
    pub fn fixes_rotation(&self) -> bool {
        self.bits() & Self::ROTATION_BIT != 0
    }

    /// Name used in stored records
    pub fn name(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::FixPosition => "FixPosition",
            Self::FixRotation => "FixRotation",
            Self::FixPositionAndRotation => "FixPositionAndRotation",
        }
    }

    /// Parse a stored name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl BitOr for FramePolicy {
    type Output = FramePolicy;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits() | rhs.bits())
    }
}

/// Error from path operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    /// Path has no keyframes to evaluate
    #[error("Path has no keyframes")]
    Empty,

    /// Keyframe not found
    #[error("Keyframe not found: {0:?}")]
    KeyframeNotFound(KeyframeId),

    /// Curve construction or evaluation failed
    #[error("Curve error: {0}")]
    Curve(#[from] CurveError),
}

/// Position, rotation and zoom curves built from the keyframes
#[derive(Debug, Clone, PartialEq)]
pub struct PathCurves {
    /// Position track
    pub position: Curve<Vec3>,
    /// Rotation track
    pub rotation: Curve<Quat>,
    /// Zoom track
    pub zoom: Curve<f32>,
}

impl PathCurves {
    /// Build all three curves from time-sorted keyframes
    pub fn build(keyframes: &[Keyframe]) -> Result<Self, CurveError> {
        let times: Vec<f32> = keyframes.iter().map(|k| k.time).collect();
        let positions: Vec<Vec3> = keyframes.iter().map(|k| k.position).collect();
        let rotations: Vec<Quat> = keyframes.iter().map(|k| k.rotation).collect();
        let zooms: Vec<f32> = keyframes.iter().map(|k| k.zoom).collect();

        Ok(Self {
            position: Curve::new(&positions, &times)?,
            rotation: Curve::new(&rotations, &times)?,
            zoom: Curve::new(&zooms, &times)?,
        })
    }
}

/// A named camera path
#[derive(Debug, Clone)]
pub struct Path {
    /// Unique path ID
    pub id: PathId,
    /// Path name
    pub name: String,
    /// Smoothing gain used during playback
    pub interpolation_rate: f32,
    /// Multiplier applied to the playback clock
    pub time_scale: f32,
    /// How the frame tracks the reference body
    pub frame_policy: FramePolicy,
    /// Keyframes, always sorted by time
    keyframes: Vec<Keyframe>,
    /// Derived curves, `None` while there are no keyframes
    curves: Option<PathCurves>,
}

impl Path {
    /// Create an empty path with default parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, &RigSettings::default())
    }

    /// Create an empty path using the configured defaults
    pub fn with_settings(name: impl Into<String>, settings: &RigSettings) -> Self {
        Self {
            id: PathId::new(),
            name: name.into(),
            interpolation_rate: settings.default_interpolation_rate,
            time_scale: settings.default_time_scale,
            frame_policy: settings.default_frame_policy,
            keyframes: Vec::new(),
            curves: None,
        }
    }

    /// Create a path from existing keyframes
    pub fn from_keyframes(
        name: impl Into<String>,
        keyframes: Vec<Keyframe>,
        interpolation_rate: f32,
        time_scale: f32,
        frame_policy: FramePolicy,
    ) -> Result<Self, PathError> {
        let mut path = Self {
            id: PathId::new(),
            name: name.into(),
            interpolation_rate,
            time_scale,
            frame_policy,
            keyframes,
            curves: None,
        };
        path.rebuild()?;
        Ok(path)
    }

    /// Add a keyframe
    pub fn add_keyframe(&mut self, pose: Pose, zoom: f32, time: f32) -> Result<KeyframeId, PathError> {
        let keyframe = Keyframe::new(pose, zoom, time);
        let id = keyframe.id;
        self.keyframes.push(keyframe);
        self.rebuild()?;
        tracing::debug!("Added keyframe {:?} to '{}' at t={}", id, self.name, time);
        Ok(id)
    }

    /// Overwrite an existing keyframe
    pub fn set_keyframe(
        &mut self,
        keyframe_id: KeyframeId,
        pose: Pose,
        zoom: f32,
        time: f32,
    ) -> Result<(), PathError> {
        let keyframe = self
            .keyframes
            .iter_mut()
            .find(|k| k.id == keyframe_id)
            .ok_or(PathError::KeyframeNotFound(keyframe_id))?;
        keyframe.set(pose, zoom, time);
        self.rebuild()?;
        tracing::debug!("Updated keyframe {:?} on '{}'", keyframe_id, self.name);
        Ok(())
    }

    /// Remove a keyframe
    pub fn remove_keyframe(&mut self, keyframe_id: KeyframeId) -> Result<Keyframe, PathError> {
        let index = self
            .keyframes
            .iter()
            .position(|k| k.id == keyframe_id)
            .ok_or(PathError::KeyframeNotFound(keyframe_id))?;
        let removed = self.keyframes.remove(index);
        self.rebuild()?;
        tracing::debug!("Removed keyframe {:?} from '{}'", keyframe_id, self.name);
        Ok(removed)
    }

    /// Re-sort keyframes and rebuild the curves
    pub fn rebuild(&mut self) -> Result<(), PathError> {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.curves = if self.keyframes.is_empty() {
            None
        } else {
            Some(PathCurves::build(&self.keyframes)?)
        };
        Ok(())
    }

    /// Evaluate the path at playback time `t` with linear interpolation
    pub fn evaluate(&self, t: f32) -> Result<PathSample, PathError> {
        self.evaluate_mode(t, CurveMode::Linear)
    }

    /// Evaluate the path at playback time `t` with the given curve mode.
    ///
    /// `t` is multiplied by the time scale before the curves are sampled.
    /// Zero-duration intervals hold the earlier keyframe.
    pub fn evaluate_mode(&self, t: f32, mode: CurveMode) -> Result<PathSample, PathError> {
        let curves = self.curves.as_ref().ok_or(PathError::Empty)?;
        let scaled = t * self.time_scale;

        Ok(PathSample {
            position: curves.position.evaluate_or_hold(scaled, mode)?,
            rotation: curves.rotation.evaluate_or_hold(scaled, mode)?,
            zoom: curves.zoom.evaluate_or_hold(scaled, mode)?,
        })
    }

    /// Derived curves, if any keyframes exist
    pub fn curves(&self) -> Option<&PathCurves> {
        self.curves.as_ref()
    }

    /// All keyframes, sorted by time
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Get keyframe by ID
    pub fn keyframe(&self, keyframe_id: KeyframeId) -> Option<&Keyframe> {
        self.keyframes.iter().find(|k| k.id == keyframe_id)
    }

    /// Get keyframe by sorted index
    pub fn keyframe_at(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    /// Get keyframe count
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the path has no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Playback seconds until the last keyframe is reached
    pub fn duration(&self) -> f32 {
        let end = self.keyframes.last().map(|k| k.time).unwrap_or(0.0);
        if self.time_scale > 0.0 {
            end / self.time_scale
        } else {
            f32::INFINITY
        }
    }

    /// Time to give a keyframe appended after the current last one
    pub fn next_keyframe_time(&self, step: f32) -> f32 {
        self.keyframes.last().map(|k| k.time + step).unwrap_or(0.0)
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new("New Path")
    }
}
