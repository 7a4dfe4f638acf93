// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera behaviors the host can switch between.

use serde::{Deserialize, Serialize};

/// Which behavior currently drives the rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBehavior {
    /// Camera held at a fixed world point
    #[default]
    Stationary,
    /// Keyframe path playback
    Path,
    /// Camera aims at a target
    LookAt,
    /// Camera trails the reference body
    FollowBody,
    /// Operator-driven free camera
    Free,
    /// Camera drifts at a constant velocity
    ConstantMovement,
}

impl CameraBehavior {
    /// All behaviors, in cycling order
    pub const ALL: [CameraBehavior; 6] = [
        CameraBehavior::Stationary,
        CameraBehavior::Path,
        CameraBehavior::LookAt,
        CameraBehavior::FollowBody,
        CameraBehavior::Free,
        CameraBehavior::ConstantMovement,
    ];

    fn index(&self) -> usize {
        Self::ALL.iter().position(|b| b == self).unwrap_or(0)
    }

    /// Next behavior, wrapping around
    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous behavior, wrapping around
    pub fn previous(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stationary => "Stationary",
            Self::Path => "Path",
            Self::LookAt => "Look At",
            Self::FollowBody => "Follow Body",
            Self::Free => "Free",
            Self::ConstantMovement => "Constant Movement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(CameraBehavior::Stationary.next(), CameraBehavior::Path);
        assert_eq!(CameraBehavior::ConstantMovement.next(), CameraBehavior::Stationary);
        assert_eq!(CameraBehavior::Stationary.previous(), CameraBehavior::ConstantMovement);
        for behavior in CameraBehavior::ALL {
            assert_eq!(behavior.next().previous(), behavior);
        }
    }
}
