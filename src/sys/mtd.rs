// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! Raw flash partitions listed in `/proc/mtd`.

use std::{
    fs::{self, OpenOptions},
    io,
    os::unix::io::{AsRawFd, IntoRawFd},
    sync::OnceLock,
};

use nix::{ioctl_read, ioctl_write_ptr};
use regex_lite::Regex;
use rustix::mount::{MountFlags, mount};

use super::{MtdError, MtdPartition};
use crate::defs;

const MTD_IOC_MAGIC: u8 = b'M';

#[repr(C)]
#[derive(Debug, Default)]
pub struct MtdInfoUser {
    pub type_: u8,
    pub flags: u32,
    pub size: u32,
    pub erasesize: u32,
    pub writesize: u32,
    pub oobsize: u32,
    pub padding: u64,
}

#[repr(C)]
pub struct EraseInfoUser {
    pub start: u32,
    pub length: u32,
}

ioctl_read!(mem_get_info, MTD_IOC_MAGIC, 1, MtdInfoUser);
ioctl_write_ptr!(mem_erase, MTD_IOC_MAGIC, 2, EraseInfoUser);
ioctl_write_ptr!(mem_get_bad_block, MTD_IOC_MAGIC, 11, libc::loff_t);

static PROC_MTD_REGEX: OnceLock<Regex> = OnceLock::new();

/// `mtdN: <size hex> <erasesize hex> "<name>"`; the header and anything else is skipped.
pub fn parse_proc_mtd(content: &str) -> Vec<MtdPartition> {
    let re = PROC_MTD_REGEX.get_or_init(|| {
        Regex::new(r#"^mtd(\d+):\s+([0-9a-fA-F]+)\s+([0-9a-fA-F]+)\s+"([^"]+)"$"#)
            .expect("Invalid Regex pattern")
    });

    content
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line.trim())?;
            Some(MtdPartition {
                index: caps[1].parse().ok()?,
                size: u64::from_str_radix(&caps[2], 16).ok()?,
                erase_size: u32::from_str_radix(&caps[3], 16).ok()?,
                name: caps[4].to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct MtdTable {
    partitions: Vec<MtdPartition>,
}

impl MtdTable {
    pub fn scan(&mut self) -> io::Result<usize> {
        let content = fs::read_to_string(defs::PROC_MTD)?;
        self.partitions = parse_proc_mtd(&content);
        Ok(self.partitions.len())
    }

    pub fn find(&self, name: &str) -> Option<MtdPartition> {
        self.partitions.iter().find(|p| p.name == name).cloned()
    }
}

/// Mounts the block emulation node of `partition`.
pub fn mount_partition(
    partition: &MtdPartition,
    mount_point: &str,
    fs_type: &str,
    read_only: bool,
) -> io::Result<()> {
    let device = format!("{}/mtdblock{}", defs::MTD_BLOCK_DIR, partition.index);

    let mut flags = MountFlags::NOATIME | MountFlags::NODEV | MountFlags::NODIRATIME;
    if read_only {
        flags |= MountFlags::RDONLY;
    }

    mount(device.as_str(), mount_point, fs_type, flags, None)?;
    Ok(())
}

/// Erases every good block of `partition` through its character device.
pub fn erase_partition(partition: &MtdPartition) -> Result<(), MtdError> {
    let name = || partition.name.clone();
    let path = format!("{}/mtd{}", defs::MTD_CHAR_DIR, partition.index);

    let file = OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|source| MtdError::Open {
            name: name(),
            source,
        })?;
    let fd = file.as_raw_fd();

    let mut info = MtdInfoUser::default();
    let (size, erase_size) = match unsafe { mem_get_info(fd, &mut info) } {
        Ok(_) => (u64::from(info.size), info.erasesize),
        Err(e) => {
            log::debug!("MEMGETINFO on {} failed: {}", path, e);
            (partition.size, partition.erase_size)
        }
    };

    if erase_size == 0 {
        return Err(MtdError::Erase {
            name: name(),
            source: io::Error::new(io::ErrorKind::InvalidData, "erase size is zero"),
        });
    }

    let mut pos: u64 = 0;
    while pos < size {
        let offset = pos as libc::loff_t;
        if let Ok(bad) = unsafe { mem_get_bad_block(fd, &offset) }
            && bad > 0
        {
            log::warn!("mtd: not erasing bad block at 0x{:08x}", pos);
            pos += u64::from(erase_size);
            continue;
        }

        let erase = EraseInfoUser {
            start: pos as u32,
            length: erase_size,
        };
        unsafe { mem_erase(fd, &erase) }.map_err(|e| MtdError::Erase {
            name: name(),
            source: e.into(),
        })?;

        pos += u64::from(erase_size);
    }

    let raw = file.into_raw_fd();
    if unsafe { libc::close(raw) } != 0 {
        return Err(MtdError::Close {
            name: name(),
            source: io::Error::last_os_error(),
        });
    }

    Ok(())
}
