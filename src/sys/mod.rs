// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! OS primitives the volume manager drives.
//!
//! Everything that touches the kernel, a device node or an external binary goes
//! through [`Host`], so the orchestration logic can run against a fake.

#[cfg(test)]
pub mod fake;
pub mod formatter;
pub mod linux;
pub mod mtd;

use std::{io, path::PathBuf};

use thiserror::Error;

pub use self::linux::LinuxHost;
use crate::core::volume::DeviceStat;

/// Runs an external command and reports its exit status.
pub trait CommandRunner {
    fn run(&mut self, argv: &[&str]) -> io::Result<i32>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtdPartition {
    pub index: u32,
    pub name: String,
    pub size: u64,
    pub erase_size: u32,
}

#[derive(Debug, Error)]
pub enum MtdError {
    #[error("can't open MTD \"{name}\": {source}")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("can't erase MTD \"{name}\": {source}")]
    Erase {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("can't close MTD \"{name}\": {source}")]
    Close {
        name: String,
        #[source]
        source: io::Error,
    },
}

pub trait MtdDriver {
    fn scan_partitions(&mut self) -> io::Result<usize>;
    fn find_partition(&self, name: &str) -> Option<MtdPartition>;
    fn mount_partition(
        &mut self,
        partition: &MtdPartition,
        mount_point: &str,
        fs_type: &str,
        read_only: bool,
    ) -> io::Result<()>;
    /// Erases every block of the partition and closes the write handle.
    fn erase_partition(&mut self, partition: &MtdPartition) -> Result<(), MtdError>;
}

/// One row of the live mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedVolume {
    pub device: String,
    pub mount_point: String,
    pub filesystem: String,
}

pub trait Host: CommandRunner + MtdDriver {
    /// `mount(2)` with `MS_NOATIME | MS_NODEV | MS_NODIRATIME` and no data.
    fn mount(&mut self, device: &str, mount_point: &str, fs_type: &str) -> io::Result<()>;
    fn bind_mount(&mut self, source: &str, target: &str) -> io::Result<()>;
    fn unmount(&mut self, mount_point: &str) -> io::Result<()>;
    fn scan_mounted_volumes(&mut self) -> io::Result<Vec<MountedVolume>>;

    fn create_dir(&mut self, path: &str, mode: u32) -> io::Result<()>;
    fn remove_dir(&mut self, path: &str) -> io::Result<()>;
    fn symlink(&mut self, target: &str, link: &str) -> io::Result<()>;
    fn read_link(&mut self, path: &str) -> io::Result<PathBuf>;
    fn rename(&mut self, from: &str, to: &str) -> io::Result<()>;
    fn write_file(&mut self, path: &str, content: &str) -> io::Result<()>;

    fn stat_device(&mut self, path: &str) -> io::Result<DeviceStat>;
    fn remove_node(&mut self, path: &str) -> io::Result<()>;
    fn make_node(&mut self, path: &str, stat: &DeviceStat) -> io::Result<()>;

    /// `length == 0` formats the whole device.
    fn build_ext4(&mut self, device: &str, length: i64, mount_point: &str) -> io::Result<()>;

    /// Formats a volume without knowing its native tooling.
    fn format_unknown_device(&mut self, request: &UnknownFormat<'_>) -> io::Result<()>;
}

/// Arguments of a delegated format.
///
/// Without `fs_type` nothing is rebuilt: the already mounted `path` is wiped,
/// sparing the `keep` subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownFormat<'a> {
    pub device: Option<&'a str>,
    pub path: &'a str,
    pub fs_type: Option<&'a str>,
    pub keep: Option<&'a str>,
}

pub fn find_mounted<'a>(mounts: &'a [MountedVolume], mount_point: &str) -> Option<&'a MountedVolume> {
    let search = mount_point.trim_end_matches('/');
    mounts.iter().find(|m| m.mount_point == search)
}
