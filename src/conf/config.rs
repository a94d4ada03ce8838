// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{core::dualboot::SystemSlot, defs};

/// Where the physical userdata partition and its per-system subfolders live
/// on a dual-system device.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DualBootPaths {
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Falls back to `<data_root>/userdata0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdata0: Option<String>,
    /// Falls back to `<data_root>/userdata1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdata1: Option<String>,
    #[serde(default = "default_moved_userdata_node")]
    pub moved_userdata_node: String,
}

fn default_data_root() -> String {
    defs::DATA_ROOT.to_string()
}

fn default_moved_userdata_node() -> String {
    defs::USERDATA_MOVED_NODE.to_string()
}

impl Default for DualBootPaths {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            userdata0: None,
            userdata1: None,
            moved_userdata_node: default_moved_userdata_node(),
        }
    }
}

impl DualBootPaths {
    /// Userdata subfolder bound for `slot`.
    pub fn userdata(&self, slot: SystemSlot) -> String {
        let configured = match slot {
            SystemSlot::System0 => &self.userdata0,
            SystemSlot::System1 => &self.userdata1,
        };

        configured.clone().unwrap_or_else(|| {
            format!(
                "{}/userdata{}",
                self.data_root.trim_end_matches('/'),
                slot.index()
            )
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_fstab")]
    pub fstab: PathBuf,
    #[serde(default)]
    pub true_dual_boot: bool,
    #[serde(default)]
    pub handle_data_media_format: bool,
    #[serde(default)]
    pub handle_true_dual_boot_format: bool,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub dual_boot: DualBootPaths,
}

fn default_fstab() -> PathBuf {
    PathBuf::from(defs::FSTAB_FILE)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(defs::LOG_FILE)
}

fn default_state_file() -> PathBuf {
    PathBuf::from(defs::STATE_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fstab: default_fstab(),
            true_dual_boot: false,
            handle_data_media_format: false,
            handle_true_dual_boot_format: false,
            log_file: default_log_file(),
            state_file: default_state_file(),
            verbose: false,
            dual_boot: DualBootPaths::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).context("failed to read config file")?;

        let config: Config = toml::from_str(&content).context("failed to parse config file")?;

        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        Self::from_file(defs::CONFIG_FILE)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("failed to create config directory")?;
        }

        fs::write(path.as_ref(), content).context("failed to write config file")?;

        Ok(())
    }

    pub fn merge_with_cli(
        &mut self,
        fstab: Option<PathBuf>,
        verbose: bool,
        true_dual_boot: bool,
        handle_data_media_format: bool,
        handle_true_dual_boot_format: bool,
    ) {
        if let Some(path) = fstab {
            self.fstab = path;
        }

        self.verbose |= verbose;
        self.true_dual_boot |= true_dual_boot;
        self.handle_data_media_format |= handle_data_media_format;
        self.handle_true_dual_boot_format |= handle_true_dual_boot_format;
    }
}
