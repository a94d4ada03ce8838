// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;

use crate::{
    core::{
        error::{FormatStage, VolumeError, VolumeResult},
        session::{Session, under_data},
        volume::{FsType, Volume},
    },
    defs,
    sys::{Host, MtdError, UnknownFormat},
};

impl<H: Host> Session<H> {
    /// Recreates the filesystem of the volume at `path`.
    ///
    /// Protected data paths and sub-paths are wiped through the generic
    /// formatter instead of being rebuilt.
    pub fn format_volume(&mut self, path: &str) -> VolumeResult<()> {
        let volume = match self.resolve(path) {
            Ok(volume) => volume,
            Err(e) => {
                // sd-ext is optional
                if path != defs::SD_EXT_PATH {
                    log::error!("{}", e);
                }
                return Err(e);
            }
        };

        if volume.fs_type == FsType::Ramdisk {
            let e = VolumeError::format(
                path,
                FormatStage::Refused,
                io::Error::new(io::ErrorKind::PermissionDenied, "the ramdisk cannot be formatted"),
            );
            log::error!("{}", e);
            return Err(e);
        }

        if self.table.is_data_media_path(path) {
            return self.wipe(None, path, None);
        }

        if under_data(path) && self.data_media_format_protected() {
            let keep = (path == defs::DATA_PATH).then_some(defs::DATA_MEDIA_DIR);
            return self.wipe(None, path, keep);
        }

        if under_data(path) && self.is_true_dual_boot() && !self.handle_true_dual_boot {
            return self.wipe(None, path, None);
        }

        if volume.mount_point != path {
            return self.wipe(volume.device(), path, None);
        }

        // With the data-media override set, the unmount guard would keep /data mounted.
        let released = if under_data(path) && self.is_data_media() {
            self.unmount_mount_point(&volume.mount_point)
        } else {
            self.ensure_path_unmounted(path)
        };
        released.map_err(|e| {
            log::error!("format_volume failed to unmount \"{}\"", volume.mount_point);
            VolumeError::format(path, FormatStage::Unmount, io::Error::other(e))
        })?;

        let result = match &volume.fs_type {
            FsType::Mtd(_) => self.erase_mtd(&volume, path),
            FsType::Ext4 => {
                let device = volume.device().unwrap_or_default();
                self.host
                    .build_ext4(device, volume.length, path)
                    .map_err(|e| VolumeError::format(path, FormatStage::Build, e))
            }
            FsType::Ramdisk
            | FsType::Bind
            | FsType::Ext3
            | FsType::Rfs
            | FsType::Vfat
            | FsType::DataMedia
            | FsType::Other(_) => {
                let request = UnknownFormat {
                    device: volume.device(),
                    path,
                    fs_type: Some(volume.fs_type.as_str()),
                    keep: None,
                };
                self.host
                    .format_unknown_device(&request)
                    .map_err(|e| VolumeError::format(path, FormatStage::Delegate, e))
            }
        };

        result.inspect_err(|e| log::error!("{}", e))
    }

    fn erase_mtd(&mut self, volume: &Volume, path: &str) -> VolumeResult<()> {
        if let Err(e) = self.host.scan_partitions() {
            log::warn!("failed to scan MTD partitions: {}", e);
        }

        let name = volume.device().unwrap_or_default();
        let partition = self.host.find_partition(name).ok_or_else(|| {
            VolumeError::format(
                path,
                FormatStage::Locate,
                io::Error::new(io::ErrorKind::NotFound, format!("no MTD partition \"{name}\"")),
            )
        })?;

        self.host.erase_partition(&partition).map_err(|e| {
            let stage = match &e {
                MtdError::Open { .. } => FormatStage::Open,
                MtdError::Erase { .. } => FormatStage::Erase,
                MtdError::Close { .. } => FormatStage::Close,
            };
            log::warn!("format_volume: {}", e);
            VolumeError::format(path, stage, io::Error::other(e))
        })
    }

    /// Generic formatter without a filesystem type: wipes the mounted tree.
    fn wipe(&mut self, device: Option<&str>, path: &str, keep: Option<&str>) -> VolumeResult<()> {
        self.ensure_path_mounted(path)
            .map_err(|e| VolumeError::format(path, FormatStage::Delegate, io::Error::other(e)))?;

        let request = UnknownFormat {
            device,
            path,
            fs_type: None,
            keep,
        };
        self.host
            .format_unknown_device(&request)
            .map_err(|e| VolumeError::format(path, FormatStage::Delegate, e))
            .inspect_err(|e| log::error!("{}", e))
    }
}
