// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    core::dualboot::{DualBootMode, SystemSlot},
    utils,
};

/// Dual-boot markers carried from one invocation to the next.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct RuntimeState {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub active_dual_boot_mode: Option<DualBootMode>,
    #[serde(default)]
    pub last_bound_data_subfolder: Option<SystemSlot>,
    #[serde(default)]
    pub bound_data_subfolders: [Option<SystemSlot>; 2],
}

impl RuntimeState {
    pub fn new(
        active_dual_boot_mode: Option<DualBootMode>,
        last_bound_data_subfolder: Option<SystemSlot>,
        bound_data_subfolders: [Option<SystemSlot>; 2],
    ) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            pid: std::process::id(),
            active_dual_boot_mode,
            last_bound_data_subfolder,
            bound_data_subfolders,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            utils::ensure_dir_exists(parent)?;
        }

        utils::atomic_write(path, json)
            .with_context(|| format!("failed to write state to {}", path.display()))
    }

    /// Missing or unreadable state means both markers are unset.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(state) => state,
            Err(e) => {
                log::warn!("ignoring unreadable state file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_unset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = RuntimeState::load(&dir.path().join("absent.json"));

        assert_eq!(state.active_dual_boot_mode, None);
        assert_eq!(state.last_bound_data_subfolder, None);
    }

    #[test]
    fn saved_markers_are_restored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        RuntimeState::new(
            Some(DualBootMode::Interchanged),
            Some(SystemSlot::System1),
            [None, Some(SystemSlot::System1)],
        )
        .save(&path)
        .expect("save");

        let state = RuntimeState::load(&path);
        assert_eq!(state.active_dual_boot_mode, Some(DualBootMode::Interchanged));
        assert_eq!(state.last_bound_data_subfolder, Some(SystemSlot::System1));
        assert_eq!(state.bound_data_subfolders, [None, Some(SystemSlot::System1)]);
        assert_eq!(state.pid, std::process::id());
    }

    #[test]
    fn older_state_without_bindings_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"active_dual_boot_mode":"both","last_bound_data_subfolder":"system0"}"#)
            .expect("write");

        let state = RuntimeState::load(&path);
        assert_eq!(state.active_dual_boot_mode, Some(DualBootMode::Both));
        assert_eq!(state.bound_data_subfolders, [None, None]);
    }

    #[test]
    fn garbage_file_loads_as_unset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").expect("write");

        assert_eq!(RuntimeState::load(&path), RuntimeState::default());
    }
}
