// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs::{self, DirBuilder},
    io,
    os::unix::fs::{DirBuilderExt, symlink},
    path::PathBuf,
};

use nix::sys::stat::{Mode, SFlag, mknod, stat};
use procfs::process::Process;
use rustix::mount::{MountFlags, UnmountFlags, mount, mount_bind, unmount};

use super::{
    CommandRunner, Host, MountedVolume, MtdDriver, MtdError, MtdPartition, UnknownFormat,
    formatter,
    mtd::{self, MtdTable},
};
use crate::{
    core::{error::exit_status_error, volume::DeviceStat},
    defs,
    utils::SystemRunner,
};

/// The real device: syscalls, `/proc` and external tools.
#[derive(Debug, Default)]
pub struct LinuxHost {
    runner: SystemRunner,
    mtd: MtdTable,
}

impl LinuxHost {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read_proc_mounts() -> io::Result<Vec<MountedVolume>> {
    let content = fs::read_to_string("/proc/mounts")?;
    Ok(content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some(MountedVolume {
                device: parts.next()?.to_string(),
                mount_point: parts.next()?.to_string(),
                filesystem: parts.next()?.to_string(),
            })
        })
        .collect())
}

impl CommandRunner for LinuxHost {
    fn run(&mut self, argv: &[&str]) -> io::Result<i32> {
        self.runner.run(argv)
    }
}

impl MtdDriver for LinuxHost {
    fn scan_partitions(&mut self) -> io::Result<usize> {
        self.mtd.scan()
    }

    fn find_partition(&self, name: &str) -> Option<MtdPartition> {
        self.mtd.find(name)
    }

    fn mount_partition(
        &mut self,
        partition: &MtdPartition,
        mount_point: &str,
        fs_type: &str,
        read_only: bool,
    ) -> io::Result<()> {
        mtd::mount_partition(partition, mount_point, fs_type, read_only)
    }

    fn erase_partition(&mut self, partition: &MtdPartition) -> Result<(), MtdError> {
        mtd::erase_partition(partition)
    }
}

impl Host for LinuxHost {
    fn mount(&mut self, device: &str, mount_point: &str, fs_type: &str) -> io::Result<()> {
        let flags = MountFlags::NOATIME | MountFlags::NODEV | MountFlags::NODIRATIME;
        mount(device, mount_point, fs_type, flags, None)?;
        Ok(())
    }

    fn bind_mount(&mut self, source: &str, target: &str) -> io::Result<()> {
        mount_bind(source, target)?;
        Ok(())
    }

    fn unmount(&mut self, mount_point: &str) -> io::Result<()> {
        unmount(mount_point, UnmountFlags::empty())?;
        Ok(())
    }

    fn scan_mounted_volumes(&mut self) -> io::Result<Vec<MountedVolume>> {
        match Process::myself().and_then(|p| p.mountinfo()) {
            Ok(mountinfo) => Ok(mountinfo
                .into_iter()
                .map(|m| MountedVolume {
                    device: m.mount_source.unwrap_or_default(),
                    mount_point: m.mount_point.to_string_lossy().into_owned(),
                    filesystem: m.fs_type,
                })
                .collect()),
            Err(e) => {
                log::debug!("mountinfo unavailable ({}), reading /proc/mounts", e);
                read_proc_mounts()
            }
        }
    }

    fn create_dir(&mut self, path: &str, mode: u32) -> io::Result<()> {
        DirBuilder::new().mode(mode).create(path)
    }

    fn remove_dir(&mut self, path: &str) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn symlink(&mut self, target: &str, link: &str) -> io::Result<()> {
        symlink(target, link)
    }

    fn read_link(&mut self, path: &str) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn write_file(&mut self, path: &str, content: &str) -> io::Result<()> {
        fs::write(path, content)
    }

    fn stat_device(&mut self, path: &str) -> io::Result<DeviceStat> {
        let st = stat(path)?;
        Ok(DeviceStat {
            mode: st.st_mode as u32,
            rdev: st.st_rdev as u64,
        })
    }

    fn remove_node(&mut self, path: &str) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn make_node(&mut self, path: &str, stat: &DeviceStat) -> io::Result<()> {
        let mode = stat.mode as libc::mode_t;
        let kind = SFlag::from_bits_truncate(mode & libc::S_IFMT);
        let perm = Mode::from_bits_truncate(mode & !libc::S_IFMT);
        mknod(path, kind, perm, stat.rdev as libc::dev_t)?;
        Ok(())
    }

    fn build_ext4(&mut self, device: &str, length: i64, mount_point: &str) -> io::Result<()> {
        let length = length.to_string();
        let mut argv = vec![defs::MAKE_EXT4FS_BIN];
        if length != "0" {
            argv.extend(["-l", length.as_str()]);
        }
        argv.extend(["-a", mount_point, device]);

        match self.runner.run(&argv)? {
            0 => Ok(()),
            code => Err(exit_status_error(defs::MAKE_EXT4FS_BIN, code)),
        }
    }

    fn format_unknown_device(&mut self, request: &UnknownFormat<'_>) -> io::Result<()> {
        formatter::format_unknown(&mut self.runner, request)
    }
}
