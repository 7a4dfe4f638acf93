// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe camera paths for a rig that rides along with a moving body.
//!
//! This crate provides:
//! - Time-parameterized curves (linear, quadratic and cubic Bezier)
//! - Keyframes and paths built from them
//! - Path-local reference frames with per-path frame policies
//! - Rubber-band playback of a path onto a camera rig
//! - A camera context that owns the path library and behaviors
//! - RON persistence for settings and paths
//!
//! ## Architecture
//!
//! The host supplies the world through three traits:
//! - [`ReferenceBody`] for the body the camera is attached to
//! - [`RigHandle`] for the camera rig being driven
//! - [`Clock`] for simulation time
//!
//! A [`CameraContext`] is advanced once per fixed tick with
//! [`CameraContext::fixed_update`].

pub mod behavior;
pub mod context;
pub mod curve;
pub mod frame;
pub mod keyframe;
pub mod path;
pub mod playback;
pub mod rig;
pub mod settings;
pub mod storage;

pub use behavior::CameraBehavior;
pub use context::{CameraContext, ContextError};
pub use curve::{Curve, CurveError, CurveMode, Interpolate};
pub use frame::FrameTransform;
pub use keyframe::{Keyframe, KeyframeId, PathSample, Pose};
pub use path::{FramePolicy, Path, PathCurves, PathError, PathId};
pub use playback::{PathPlayer, PlaybackError, PlaybackState};
pub use rig::{Clock, ReferenceBody, RigHandle, RigState, SimClock, StaticBody};
pub use settings::RigSettings;
pub use storage::{PathLibraryFile, PathRecord, StorageError};
