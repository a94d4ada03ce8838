// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;

use crate::{
    core::{
        error::{VolumeError, VolumeResult},
        session::{Session, data_index, under_data},
        volume::FsType,
    },
    defs,
    sys::{Host, find_mounted},
};

impl<H: Host> Session<H> {
    /// Unmounts the volume owning `path`; unmounted volumes succeed.
    ///
    /// `/data` stays mounted on data-media devices whatever the format
    /// overrides say, and the data root stays mounted under true-dual-boot.
    /// The ramdisk can never be unmounted.
    pub fn ensure_path_unmounted(&mut self, path: &str) -> VolumeResult<()> {
        if under_data(path) && self.is_data_media() {
            return Ok(());
        }

        if path.starts_with(self.paths.data_root.as_str()) {
            if self.data_root_protected() {
                return Ok(());
            }
            return self.unmount_data_root();
        }

        let volume = self.resolve(path).inspect_err(|e| log::error!("{}", e))?;

        if self.table.is_data_media_path(path) {
            return self.ensure_path_unmounted(defs::DATA_PATH);
        }

        if volume.fs_type == FsType::Ramdisk {
            let e = VolumeError::unmount(
                &volume.mount_point,
                io::Error::new(io::ErrorKind::PermissionDenied, "the ramdisk is always mounted"),
            );
            log::error!("{}", e);
            return Err(e);
        }

        let mounts = self.host.scan_mounted_volumes().map_err(|e| {
            log::error!("failed to scan mounted volumes");
            VolumeError::ScanFailure(e)
        })?;

        // Nothing keeps the data root mounted once true-dual-boot is off or overridden.
        if under_data(path) && self.is_dual_system() && !self.data_root_protected() {
            if let Some(root) = find_mounted(&mounts, &self.paths.data_root) {
                let root = root.mount_point.clone();
                if let Err(e) = self.host.unmount(&root) {
                    log::warn!("failed to unmount {}: {}", root, e);
                }
            }
        }

        let Some(mounted) = find_mounted(&mounts, &volume.mount_point) else {
            return Ok(());
        };
        let mount_point = mounted.mount_point.clone();

        self.host
            .unmount(&mount_point)
            .map_err(|e| VolumeError::unmount(&mount_point, e))
            .inspect_err(|e| log::error!("{}", e))?;

        if let Some(index) = data_index(&volume.mount_point) {
            self.bound[index] = None;
        }
        Ok(())
    }

    fn data_root_protected(&self) -> bool {
        self.is_true_dual_boot() && !self.handle_true_dual_boot
    }

    /// The data root has no table entry of its own.
    fn unmount_data_root(&mut self) -> VolumeResult<()> {
        let data_root = self.paths.data_root.clone();
        self.unmount_mount_point(&data_root)
    }

    /// Unmounts whatever sits on `mount_point`, bypassing the data guards.
    pub(crate) fn unmount_mount_point(&mut self, mount_point: &str) -> VolumeResult<()> {
        let mounts = self
            .host
            .scan_mounted_volumes()
            .map_err(VolumeError::ScanFailure)?;

        let Some(mounted) = find_mounted(&mounts, mount_point) else {
            return Ok(());
        };
        let target = mounted.mount_point.clone();

        self.host
            .unmount(&target)
            .map_err(|e| VolumeError::unmount(&target, e))
            .inspect_err(|e| log::error!("{}", e))
    }
}
