// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory [`Host`] that records every primitive it is asked to perform.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    io,
    path::PathBuf,
};

use super::{
    CommandRunner, Host, MountedVolume, MtdDriver, MtdError, MtdPartition, UnknownFormat,
};
use crate::{
    conf::config::DualBootPaths,
    core::{session::Session, table::VolumeTable, volume::DeviceStat},
};

pub const DUAL_FSTAB: &str = "/system ext4 /dev/block/system\n\
                              /system1 ext4 /dev/block/system1\n\
                              /boot emmc /dev/block/boot\n\
                              /boot1 emmc /dev/block/boot1\n\
                              /data ext4 /dev/block/userdata\n\
                              /cache ext4 /dev/block/cache\n";

const BLOCK_NODES: [(&str, u64); 8] = [
    ("/dev/block/system", 0xb301),
    ("/dev/block/system1", 0xb302),
    ("/dev/block/boot", 0xb303),
    ("/dev/block/boot1", 0xb304),
    ("/dev/block/radio", 0xb305),
    ("/dev/block/radio1", 0xb306),
    ("/dev/block/userdata", 0xb307),
    ("/dev/block/cache", 0xb308),
];

/// Session over a fake host that already has the usual block nodes.
pub fn session(fstab: &str) -> Session<FakeHost> {
    session_with_paths(fstab, DualBootPaths::default())
}

pub fn session_with_paths(fstab: &str, paths: DualBootPaths) -> Session<FakeHost> {
    let mut host = FakeHost::default();
    for (path, rdev) in BLOCK_NODES {
        host.add_node(path, 0o060600, rdev);
    }

    let (table, _) = VolumeTable::parse(fstab, &mut host, &paths);
    host.clear_calls();
    Session::new(host, table, paths)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtdStage {
    Open,
    Erase,
    Close,
}

#[derive(Debug, Default)]
pub struct FakeHost {
    calls: Vec<String>,
    mounts: Vec<MountedVolume>,
    nodes: HashMap<String, DeviceStat>,
    links: HashMap<String, String>,
    dirs: BTreeSet<String>,
    files: HashMap<String, String>,
    mtd: Vec<MtdPartition>,
    failing_mounts: HashSet<(String, String)>,
    failing_unmounts: HashSet<String>,
    failing_commands: Vec<String>,
    failing_nodes: HashSet<String>,
    pub fail_scan: bool,
    pub fail_ext4: bool,
    pub fail_unknown_format: bool,
    pub mtd_failure: Option<MtdStage>,
}

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

impl FakeHost {
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Recorded calls starting with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    pub fn add_node(&mut self, path: &str, mode: u32, rdev: u64) {
        self.nodes.insert(path.to_string(), DeviceStat { mode, rdev });
    }

    pub fn node(&self, path: &str) -> Option<DeviceStat> {
        self.nodes.get(path).copied()
    }

    pub fn add_link(&mut self, link: &str, target: &str) {
        self.links.insert(link.to_string(), target.to_string());
    }

    pub fn link(&self, link: &str) -> Option<&str> {
        self.links.get(link).map(String::as_str)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn add_mounted(&mut self, device: &str, mount_point: &str, filesystem: &str) {
        self.mounts.push(MountedVolume {
            device: device.to_string(),
            mount_point: mount_point.to_string(),
            filesystem: filesystem.to_string(),
        });
    }

    pub fn is_mounted(&self, mount_point: &str) -> bool {
        self.mounts.iter().any(|m| m.mount_point == mount_point)
    }

    pub fn mounted_device(&self, mount_point: &str) -> Option<&str> {
        self.mounts
            .iter()
            .rev()
            .find(|m| m.mount_point == mount_point)
            .map(|m| m.device.as_str())
    }

    pub fn fail_mount(&mut self, device: &str, fs_type: &str) {
        self.failing_mounts
            .insert((device.to_string(), fs_type.to_string()));
    }

    pub fn fail_unmount(&mut self, mount_point: &str) {
        self.failing_unmounts.insert(mount_point.to_string());
    }

    pub fn fail_command(&mut self, prefix: &str) {
        self.failing_commands.push(prefix.to_string());
    }

    pub fn fail_make_node(&mut self, path: &str) {
        self.failing_nodes.insert(path.to_string());
    }

    pub fn add_mtd_partition(&mut self, name: &str) {
        let index = self.mtd.len() as u32;
        self.mtd.push(MtdPartition {
            index,
            name: name.to_string(),
            size: 0x0050_0000,
            erase_size: 0x0002_0000,
        });
    }

    fn push_mount(&mut self, device: &str, mount_point: &str, filesystem: &str) {
        self.add_mounted(device, mount_point, filesystem);
    }
}

impl CommandRunner for FakeHost {
    fn run(&mut self, argv: &[&str]) -> io::Result<i32> {
        let line = argv.join(" ");
        self.calls.push(format!("run {line}"));

        if self.failing_commands.iter().any(|p| line.starts_with(p)) {
            return Ok(1);
        }

        match argv {
            ["mount", "-t", fs_type, "-o", _, device, mount_point] => {
                if self
                    .failing_mounts
                    .contains(&(device.to_string(), fs_type.to_string()))
                {
                    return Ok(255);
                }
                self.push_mount(device, mount_point, fs_type);
            }
            ["mount", mount_point] => {
                self.push_mount("fstab", mount_point, "auto");
            }
            _ => {}
        }
        Ok(0)
    }
}

impl MtdDriver for FakeHost {
    fn scan_partitions(&mut self) -> io::Result<usize> {
        self.calls.push("mtd_scan".to_string());
        Ok(self.mtd.len())
    }

    fn find_partition(&self, name: &str) -> Option<MtdPartition> {
        self.mtd.iter().find(|p| p.name == name).cloned()
    }

    fn mount_partition(
        &mut self,
        partition: &MtdPartition,
        mount_point: &str,
        fs_type: &str,
        _read_only: bool,
    ) -> io::Result<()> {
        self.calls
            .push(format!("mtd_mount {} {mount_point} {fs_type}", partition.name));
        let device = format!("/dev/block/mtdblock{}", partition.index);
        self.push_mount(&device, mount_point, fs_type);
        Ok(())
    }

    fn erase_partition(&mut self, partition: &MtdPartition) -> Result<(), MtdError> {
        self.calls.push(format!("mtd_erase {}", partition.name));
        let name = partition.name.clone();
        match self.mtd_failure {
            None => Ok(()),
            Some(MtdStage::Open) => Err(MtdError::Open {
                name,
                source: errno(libc::EACCES),
            }),
            Some(MtdStage::Erase) => Err(MtdError::Erase {
                name,
                source: errno(libc::EIO),
            }),
            Some(MtdStage::Close) => Err(MtdError::Close {
                name,
                source: errno(libc::EIO),
            }),
        }
    }
}

impl Host for FakeHost {
    fn mount(&mut self, device: &str, mount_point: &str, fs_type: &str) -> io::Result<()> {
        self.calls
            .push(format!("mount {device} {mount_point} {fs_type}"));
        if self
            .failing_mounts
            .contains(&(device.to_string(), fs_type.to_string()))
        {
            return Err(errno(libc::EINVAL));
        }
        self.push_mount(device, mount_point, fs_type);
        Ok(())
    }

    fn bind_mount(&mut self, source: &str, target: &str) -> io::Result<()> {
        self.calls.push(format!("bind {source} {target}"));
        self.push_mount(source, target, "bind");
        Ok(())
    }

    fn unmount(&mut self, mount_point: &str) -> io::Result<()> {
        self.calls.push(format!("umount {mount_point}"));
        if self.failing_unmounts.contains(mount_point) {
            return Err(errno(libc::EBUSY));
        }
        match self.mounts.iter().rposition(|m| m.mount_point == mount_point) {
            Some(index) => {
                self.mounts.remove(index);
                Ok(())
            }
            None => Err(errno(libc::EINVAL)),
        }
    }

    fn scan_mounted_volumes(&mut self) -> io::Result<Vec<MountedVolume>> {
        if self.fail_scan {
            return Err(errno(libc::ENOENT));
        }
        Ok(self.mounts.clone())
    }

    fn create_dir(&mut self, path: &str, _mode: u32) -> io::Result<()> {
        self.calls.push(format!("mkdir {path}"));
        if !self.dirs.insert(path.to_string()) {
            return Err(errno(libc::EEXIST));
        }
        Ok(())
    }

    fn remove_dir(&mut self, path: &str) -> io::Result<()> {
        self.calls.push(format!("rmdir {path}"));
        if self.dirs.remove(path) {
            Ok(())
        } else {
            Err(errno(libc::ENOENT))
        }
    }

    fn symlink(&mut self, target: &str, link: &str) -> io::Result<()> {
        self.calls.push(format!("symlink {target} {link}"));
        if self.links.contains_key(link) {
            return Err(errno(libc::EEXIST));
        }
        self.add_link(link, target);
        Ok(())
    }

    fn read_link(&mut self, path: &str) -> io::Result<PathBuf> {
        self.links
            .get(path)
            .map(PathBuf::from)
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        self.calls.push(format!("rename {from} {to}"));
        match self.nodes.remove(from) {
            Some(stat) => {
                self.nodes.insert(to.to_string(), stat);
                Ok(())
            }
            None => Err(errno(libc::ENOENT)),
        }
    }

    fn write_file(&mut self, path: &str, content: &str) -> io::Result<()> {
        self.calls.push(format!("write {path} {content}"));
        self.files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn stat_device(&mut self, path: &str) -> io::Result<DeviceStat> {
        self.nodes.get(path).copied().ok_or_else(|| errno(libc::ENOENT))
    }

    fn remove_node(&mut self, path: &str) -> io::Result<()> {
        self.calls.push(format!("unlink {path}"));
        self.nodes
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| errno(libc::ENOENT))
    }

    fn make_node(&mut self, path: &str, stat: &DeviceStat) -> io::Result<()> {
        self.calls
            .push(format!("mknod {path} {:o} {:#x}", stat.mode, stat.rdev));
        if self.failing_nodes.contains(path) {
            return Err(errno(libc::EPERM));
        }
        self.nodes.insert(path.to_string(), *stat);
        Ok(())
    }

    fn build_ext4(&mut self, device: &str, length: i64, mount_point: &str) -> io::Result<()> {
        self.calls
            .push(format!("make_ext4fs {device} {length} {mount_point}"));
        if self.fail_ext4 {
            return Err(errno(libc::EIO));
        }
        Ok(())
    }

    fn format_unknown_device(&mut self, request: &UnknownFormat<'_>) -> io::Result<()> {
        self.calls.push(format!(
            "format_unknown {} {} {} keep={}",
            request.device.unwrap_or("-"),
            request.path,
            request.fs_type.unwrap_or("-"),
            request.keep.unwrap_or("-"),
        ));
        if self.fail_unknown_format {
            return Err(errno(libc::EIO));
        }
        Ok(())
    }
}
