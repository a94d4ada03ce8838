// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{borrow::Cow, fmt};

use serde::{Serialize, Serializer};

/// String field that is either a shared `'static` constant or an owned copy
/// read from the fstab. Dropping a `Borrowed` value never frees anything.
pub type Text = Cow<'static, str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtdFlavor {
    /// yaffs2 filesystem living on an MTD partition.
    Yaffs2,
    /// Raw MTD partition with no mountable filesystem.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsType {
    Ramdisk,
    Bind,
    Mtd(MtdFlavor),
    Ext4,
    Ext3,
    Rfs,
    Vfat,
    DataMedia,
    Other(String),
}

impl FsType {
    pub fn parse(name: &str) -> Self {
        match name {
            "ramdisk" => Self::Ramdisk,
            "bind" => Self::Bind,
            "yaffs2" => Self::Mtd(MtdFlavor::Yaffs2),
            "mtd" => Self::Mtd(MtdFlavor::Raw),
            "ext4" => Self::Ext4,
            "ext3" => Self::Ext3,
            "rfs" => Self::Rfs,
            "vfat" => Self::Vfat,
            "datamedia" => Self::DataMedia,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ramdisk => "ramdisk",
            Self::Bind => "bind",
            Self::Mtd(MtdFlavor::Yaffs2) => "yaffs2",
            Self::Mtd(MtdFlavor::Raw) => "mtd",
            Self::Ext4 => "ext4",
            Self::Ext3 => "ext3",
            Self::Rfs => "rfs",
            Self::Vfat => "vfat",
            Self::DataMedia => "datamedia",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FsType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Device node identity captured with `stat` when the table is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStat {
    pub mode: u32,
    pub rdev: u64,
}

impl DeviceStat {
    pub fn major(&self) -> u64 {
        nix::sys::stat::major(self.rdev as libc::dev_t) as u64
    }

    pub fn minor(&self) -> u64 {
        nix::sys::stat::minor(self.rdev as libc::dev_t) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volume {
    pub mount_point: Text,
    pub fs_type: FsType,
    pub fs_type2: Option<FsType>,
    pub device: Option<Text>,
    pub device2: Option<Text>,
    pub fs_options: Option<Text>,
    pub fs_options2: Option<Text>,
    pub lun: Option<Text>,
    pub length: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat: Option<DeviceStat>,
}

impl Volume {
    /// A device-less volume whose fields are all static constants.
    pub fn synthetic(mount_point: &'static str, fs_type: FsType) -> Self {
        Self {
            mount_point: Cow::Borrowed(mount_point),
            fs_type,
            fs_type2: None,
            device: None,
            device2: None,
            fs_options: None,
            fs_options2: None,
            lun: None,
            length: 0,
            stat: None,
        }
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// `mount_point` is a prefix of `path` ending on a path component boundary.
    pub fn covers(&self, path: &str) -> bool {
        path.strip_prefix(self.mount_point.as_ref())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_type_names_round_trip_through_parse() {
        for name in ["ramdisk", "bind", "yaffs2", "mtd", "ext4", "ext3", "rfs", "vfat", "datamedia"] {
            assert_eq!(FsType::parse(name).as_str(), name);
        }
        assert_eq!(FsType::parse("f2fs"), FsType::Other("f2fs".to_string()));
    }

    #[test]
    fn covers_requires_component_boundary() {
        let cache = Volume::synthetic("/cache", FsType::Ext4);
        assert!(cache.covers("/cache"));
        assert!(cache.covers("/cache/recovery/log"));
        assert!(!cache.covers("/cachefoo"));
        assert!(!cache.covers("/cach"));
    }

    #[test]
    fn synthetic_volume_borrows_its_mount_point() {
        let tmp = Volume::synthetic("/tmp", FsType::Ramdisk);
        assert!(matches!(tmp.mount_point, Cow::Borrowed(_)));
        assert!(tmp.device().is_none());
        assert_eq!(tmp.length, 0);
    }
}
