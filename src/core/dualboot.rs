// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::core::error::VolumeError;

/// Which system image pair is wired to the generic device nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DualBootMode {
    System0,
    System1,
    Both,
    Interchanged,
}

/// One of the two system images, also naming its userdata subfolder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemSlot {
    System0,
    System1,
}

impl SystemSlot {
    pub fn index(self) -> usize {
        match self {
            Self::System0 => 0,
            Self::System1 => 1,
        }
    }
}

/// Slot backing each of the two destinations `[index0, index1]`.
///
/// An unset mode behaves like [`DualBootMode::Both`].
pub fn select_slots(mode: Option<DualBootMode>) -> [SystemSlot; 2] {
    use SystemSlot::*;

    match mode {
        Some(DualBootMode::System0) => [System0, System0],
        Some(DualBootMode::System1) => [System1, System1],
        Some(DualBootMode::Both) | None => [System0, System1],
        Some(DualBootMode::Interchanged) => [System1, System0],
    }
}

impl TryFrom<i32> for DualBootMode {
    type Error = VolumeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::System0),
            1 => Ok(Self::System1),
            2 => Ok(Self::Both),
            3 => Ok(Self::Interchanged),
            other => Err(VolumeError::UnsupportedSelector(other.to_string())),
        }
    }
}

impl FromStr for DualBootMode {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(number) = s.parse::<i32>() {
            return Self::try_from(number);
        }
        match s.to_ascii_lowercase().as_str() {
            "system0" => Ok(Self::System0),
            "system1" => Ok(Self::System1),
            "both" => Ok(Self::Both),
            "interchanged" => Ok(Self::Interchanged),
            _ => Err(VolumeError::UnsupportedSelector(s.to_string())),
        }
    }
}

impl fmt::Display for DualBootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::System0 => "system0",
            Self::System1 => "system1",
            Self::Both => "both",
            Self::Interchanged => "interchanged",
        };
        f.write_str(name)
    }
}
