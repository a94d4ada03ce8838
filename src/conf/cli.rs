// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::defs;

#[derive(Parser, Debug)]
#[command(name = "recovery-volumes", version, about = "Recovery volume manager")]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[arg(short = 'f', long = "fstab")]
    pub fstab: Option<PathBuf>,
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Keep the data root mounted and bind per-system userdata onto /data.
    #[arg(long = "true-dual-boot")]
    pub true_dual_boot: bool,
    #[arg(long = "handle-data-media-format")]
    pub handle_data_media_format: bool,
    #[arg(long = "handle-true-dual-boot-format")]
    pub handle_true_dual_boot_format: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the volume table as JSON.
    Volumes,
    /// Print the device flags and dual-boot markers as JSON.
    Status {
        /// Also report whether this path is a data-media path.
        #[arg(long)]
        path: Option<String>,
    },
    Mount {
        path: String,
        /// Mount here instead of the volume's own mount point.
        #[arg(long = "at")]
        at: Option<String>,
    },
    Umount {
        path: String,
    },
    Format {
        path: String,
    },
    /// Rewire the generic system nodes: 0|1|2|3 or system0|system1|both|interchanged.
    Activate {
        selector: String,
    },
    #[command(name = "ums-share")]
    UmsShare {
        path: String,
    },
    #[command(name = "ums-unshare")]
    UmsUnshare,
    GenConfig {
        #[arg(short = 'o', long = "output", default_value = defs::CONFIG_FILE)]
        output: PathBuf,
    },
    ShowConfig,
}
