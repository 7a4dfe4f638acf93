// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rig settings and configuration.
//!
//! This module manages defaults applied when paths are created and
//! keyframes are recorded, and the playback options:
//! - Default interpolation rate, time scale and frame policy
//! - Keyframe time step and zoom range for recording
//! - End-of-path behavior
//! - Path library file name

use crate::path::FramePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "camrig.ron";

/// Default path library file name
pub const DEFAULT_LIBRARY_FILE: &str = "camera_paths.ron";

/// Rig-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSettings {
    /// Settings format version
    pub version: u32,
    /// Smoothing gain given to new paths
    pub default_interpolation_rate: f32,
    /// Time scale given to new paths
    pub default_time_scale: f32,
    /// Frame policy given to new paths
    pub default_frame_policy: FramePolicy,
    /// Time added after the last keyframe when recording a new one
    pub keyframe_time_step: f32,
    /// Zoom recorded in place of a non-finite rig zoom
    pub default_zoom: f32,
    /// Lowest recordable zoom
    pub min_zoom: f32,
    /// Highest recordable zoom
    pub max_zoom: f32,
    /// Stop playback once the path clock passes the last keyframe
    pub stop_at_end: bool,
    /// Path library file (relative to the host's data directory)
    pub library_file: PathBuf,
}

impl Default for RigSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            default_interpolation_rate: 15.0,
            default_time_scale: 1.0,
            default_frame_policy: FramePolicy::Free,
            keyframe_time_step: 1.0,
            default_zoom: 1.0,
            min_zoom: 1.0,
            max_zoom: 8.0,
            stop_at_end: false,
            library_file: PathBuf::from(DEFAULT_LIBRARY_FILE),
        }
    }
}

impl RigSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: RigSettings = ron::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Settings version {} is newer than supported version {}",
                    settings.version, SETTINGS_FORMAT_VERSION
                ),
            ));
        }

        Ok(settings)
    }

    /// Load settings, falling back to defaults if the file is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to load rig settings from {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    /// Clamp a zoom value to the recordable range
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            self.default_zoom
        }
    }
}
