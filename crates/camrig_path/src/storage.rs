// SPDX-License-Identifier: MIT OR Apache-2.0
//! Path persistence.
//!
//! Paths are stored as flat records holding parallel, string-encoded arrays
//! (`positions`, `rotations`, `zooms`, `times`) rather than nested
//! per-keyframe records. Lists are `;`-separated and vector components are
//! `,`-separated: `x,y,z;x,y,z`, `x,y,z,w;...`, `a;b;c`.
//!
//! A library file is a RON [`PathLibraryFile`] holding a list of records.

use crate::keyframe::{Keyframe, Pose};
use crate::path::{FramePolicy, Path, PathError};
use crate::settings::RigSettings;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Current library format version
pub const LIBRARY_FORMAT_VERSION: u32 = 1;

/// Error reading or writing stored paths
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON decoding error
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// RON encoding error
    #[error("RON encode error: {0}")]
    RonEncode(#[from] ron::Error),

    /// A list entry could not be parsed
    #[error("Invalid {field} entry: '{value}'")]
    Parse {
        /// Record field being parsed
        field: &'static str,
        /// Offending text
        value: String,
    },

    /// Parallel arrays differ in length
    #[error("Path '{name}' has mismatched arrays: {positions} positions, {rotations} rotations, {zooms} zooms, {times} times")]
    LengthMismatch {
        /// Path name
        name: String,
        /// Number of positions
        positions: usize,
        /// Number of rotations
        rotations: usize,
        /// Number of zooms
        zooms: usize,
        /// Number of times
        times: usize,
    },

    /// Unknown frame policy name
    #[error("Unknown frame policy: {0}")]
    UnknownFrame(String),

    /// Library file is newer than this build understands
    #[error("Library version {0} is newer than supported version {max}", max = LIBRARY_FORMAT_VERSION)]
    UnsupportedVersion(u32),

    /// The path could not be built from the stored samples
    #[error("Path error: {0}")]
    Path(#[from] PathError),
}

/// Flat stored form of a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    /// Path name
    #[serde(default)]
    pub name: String,
    /// Encoded keyframe positions
    #[serde(default)]
    pub positions: String,
    /// Encoded keyframe rotations
    #[serde(default)]
    pub rotations: String,
    /// Encoded keyframe zooms
    #[serde(default)]
    pub zooms: String,
    /// Encoded keyframe times
    #[serde(default)]
    pub times: String,
    /// Playback smoothing gain
    #[serde(default = "default_lerp_rate")]
    pub lerp_rate: f32,
    /// Playback time scale
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    /// Frame policy name
    #[serde(default)]
    pub frame: String,
}

fn default_lerp_rate() -> f32 {
    RigSettings::default().default_interpolation_rate
}

fn default_time_scale() -> f32 {
    RigSettings::default().default_time_scale
}

impl PathRecord {
    /// Encode a path
    pub fn from_path(path: &Path) -> Self {
        let keyframes = path.keyframes();
        Self {
            name: path.name.clone(),
            positions: join(keyframes.iter().map(|k| encode_components(&k.position.to_array()))),
            rotations: join(keyframes.iter().map(|k| encode_components(&k.rotation.to_array()))),
            zooms: join(keyframes.iter().map(|k| k.zoom.to_string())),
            times: join(keyframes.iter().map(|k| k.time.to_string())),
            lerp_rate: path.interpolation_rate,
            time_scale: path.time_scale,
            frame: path.frame_policy.name().to_string(),
        }
    }

    /// Decode into a path, using `default_frame` when the record has no frame name
    pub fn to_path(&self, default_frame: FramePolicy) -> Result<Path, StorageError> {
        let positions = split(&self.positions)
            .map(|s| parse_components::<3>("positions", s).map(Vec3::from_array))
            .collect::<Result<Vec<_>, _>>()?;
        let rotations = split(&self.rotations)
            .map(parse_rotation)
            .collect::<Result<Vec<_>, _>>()?;
        let zooms = split(&self.zooms)
            .map(|s| parse_scalar("zooms", s))
            .collect::<Result<Vec<_>, _>>()?;
        let times = split(&self.times)
            .map(|s| parse_scalar("times", s))
            .collect::<Result<Vec<_>, _>>()?;

        let count = times.len();
        if positions.len() != count || rotations.len() != count || zooms.len() != count {
            return Err(StorageError::LengthMismatch {
                name: self.name.clone(),
                positions: positions.len(),
                rotations: rotations.len(),
                zooms: zooms.len(),
                times: count,
            });
        }

        let lerp_rate = finite("lerp_rate", self.lerp_rate)?;
        let time_scale = finite("time_scale", self.time_scale)?;

        let frame = match self.frame.trim() {
            "" => default_frame,
            name => FramePolicy::from_name(name).ok_or_else(|| StorageError::UnknownFrame(name.to_string()))?,
        };

        let keyframes = positions
            .into_iter()
            .zip(rotations)
            .zip(zooms)
            .zip(times)
            .map(|(((position, rotation), zoom), time)| Keyframe::new(Pose::new(position, rotation), zoom, time))
            .collect();

        Ok(Path::from_keyframes(
            self.name.clone(),
            keyframes,
            lerp_rate,
            time_scale,
            frame,
        )?)
    }
}

/// File-level container for stored paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathLibraryFile {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Stored paths
    #[serde(default)]
    pub paths: Vec<PathRecord>,
}

fn default_version() -> u32 {
    LIBRARY_FORMAT_VERSION
}

impl PathLibraryFile {
    /// Container for the given paths
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Self {
        Self {
            version: LIBRARY_FORMAT_VERSION,
            paths: paths.into_iter().map(PathRecord::from_path).collect(),
        }
    }

    /// Decode every record, skipping (and logging) the ones that fail
    pub fn into_paths(self, default_frame: FramePolicy) -> Vec<Path> {
        self.paths
            .iter()
            .filter_map(|record| match record.to_path(default_frame) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Skipping stored path '{}': {}", record.name, e);
                    None
                }
            })
            .collect()
    }

    /// Parse a library from RON text
    pub fn from_ron(content: &str) -> Result<Self, StorageError> {
        let file: PathLibraryFile = ron::from_str(content)?;
        if file.version > LIBRARY_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion(file.version));
        }
        Ok(file)
    }

    /// Encode as RON text
    pub fn to_ron(&self) -> Result<String, StorageError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }
}

/// Load all paths from a library file
pub fn load_library(file: &std::path::Path, default_frame: FramePolicy) -> Result<Vec<Path>, StorageError> {
    let content = std::fs::read_to_string(file)?;
    let paths = PathLibraryFile::from_ron(&content)?.into_paths(default_frame);
    tracing::info!("Loaded {} camera paths from {:?}", paths.len(), file);
    Ok(paths)
}

/// Save paths to a library file
pub fn save_library<'a>(
    file: &std::path::Path,
    paths: impl IntoIterator<Item = &'a Path>,
) -> Result<(), StorageError> {
    let library = PathLibraryFile::from_paths(paths);
    let content = library.to_ron()?;
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file, content)?;
    tracing::info!("Saved {} camera paths to {:?}", library.paths.len(), file);
    Ok(())
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(";")
}

fn split(list: &str) -> impl Iterator<Item = &str> {
    list.split(';').map(str::trim).filter(|s| !s.is_empty())
}

fn encode_components(components: &[f32]) -> String {
    components
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn finite(field: &'static str, value: f32) -> Result<f32, StorageError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(StorageError::Parse {
            field,
            value: value.to_string(),
        })
    }
}

fn parse_scalar(field: &'static str, text: &str) -> Result<f32, StorageError> {
    match text.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(StorageError::Parse {
            field,
            value: text.to_string(),
        }),
    }
}

/// Parse a quaternion, rejecting ones too short to normalize
fn parse_rotation(text: &str) -> Result<Quat, StorageError> {
    let rotation = Quat::from_array(parse_components::<4>("rotations", text)?);
    if rotation.length_squared() < 1e-6 {
        return Err(StorageError::Parse {
            field: "rotations",
            value: text.to_string(),
        });
    }
    Ok(rotation)
}

fn parse_components<const N: usize>(field: &'static str, text: &str) -> Result<[f32; N], StorageError> {
    let invalid = || StorageError::Parse {
        field,
        value: text.to_string(),
    };

    // Tolerate wrapping parentheses from older files
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    let mut out = [0.0; N];
    let mut parts = inner.split(',');
    for slot in out.iter_mut() {
        let part = parts.next().ok_or_else(invalid)?;
        *slot = part
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(invalid)?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(out)
}
