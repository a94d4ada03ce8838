// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;

use crate::{
    core::{
        dualboot::{SystemSlot, select_slots},
        error::{FallbackCombo, MountAttempt, VolumeError, VolumeResult, exit_status_error},
        session::{Session, data_index},
        volume::{FsType, MtdFlavor, Volume},
    },
    defs,
    sys::{Host, find_mounted},
};

impl<H: Host> Session<H> {
    pub fn ensure_path_mounted(&mut self, path: &str) -> VolumeResult<()> {
        self.ensure_path_mounted_at(path, None)
    }

    /// Mounts the volume owning `path`, at `mount_point` if given.
    ///
    /// Already mounted targets are left alone.
    pub fn ensure_path_mounted_at(&mut self, path: &str, mount_point: Option<&str>) -> VolumeResult<()> {
        let volume = self.resolve(path).inspect_err(|e| log::error!("{}", e))?;

        if self.table.is_data_media_path(path) {
            log::info!("using {} for {}.", defs::DATA_MEDIA_DIR, path);
            self.ensure_path_mounted(defs::DATA_PATH)?;
            self.setup_data_media();
            return Ok(());
        }

        if volume.fs_type == FsType::Ramdisk {
            return Ok(());
        }

        let mounts = self.host.scan_mounted_volumes().map_err(|e| {
            log::error!("failed to scan mounted volumes");
            VolumeError::ScanFailure(e)
        })?;

        let mount_point = mount_point.unwrap_or(volume.mount_point.as_ref());

        if let Some(index) = data_index(path)
            && mount_point != self.paths.data_root
            && self.is_true_dual_boot()
        {
            return self.bind_data(path, index, mount_point);
        }

        if find_mounted(&mounts, mount_point).is_some() {
            return Ok(());
        }

        if let Err(e) = self.host.create_dir(mount_point, 0o755) {
            log::debug!("mkdir {}: {}", mount_point, e);
        }

        let result = match &volume.fs_type {
            FsType::Mtd(MtdFlavor::Yaffs2) => self.mount_mtd(&volume, mount_point),
            FsType::Ext4 | FsType::Ext3 | FsType::Rfs | FsType::Vfat => {
                self.mount_with_fallback(&volume, mount_point)
            }
            FsType::Mtd(MtdFlavor::Raw)
            | FsType::Bind
            | FsType::Ramdisk
            | FsType::DataMedia
            | FsType::Other(_) => self.mount_generic(mount_point),
        };

        result.inspect_err(|e| log::error!("{}", e))
    }

    /// Binds the userdata subfolder selected by the active mode onto the
    /// logical data path, mounting the data root first.
    fn bind_data(&mut self, path: &str, index: usize, mount_point: &str) -> VolumeResult<()> {
        let data_root = self.paths.data_root.clone();
        self.ensure_path_mounted_at(defs::DATA_PATH, Some(data_root.as_str()))?;

        let slot = select_slots(self.active_mode)[index];
        let tracked = mount_point == path;

        let mounts = self
            .host
            .scan_mounted_volumes()
            .map_err(VolumeError::ScanFailure)?;

        // Only this path's own binding counts; anything else mounted there is replaced.
        if find_mounted(&mounts, mount_point).is_some() {
            if tracked && self.bound[index] == Some(slot) {
                return Ok(());
            }

            log::info!(
                "{} is bound to {:?}, switching to {:?}",
                path,
                self.bound[index],
                slot
            );
            self.host
                .unmount(mount_point)
                .map_err(|e| VolumeError::unmount(mount_point, e))
                .inspect_err(|e| log::error!("{}", e))?;
            if tracked {
                self.bound[index] = None;
            }
        }

        let dirs = [
            data_root,
            self.paths.userdata(SystemSlot::System0),
            self.paths.userdata(SystemSlot::System1),
            mount_point.to_string(),
        ];
        for dir in &dirs {
            if let Err(e) = self.host.create_dir(dir, 0o755) {
                log::debug!("mkdir {}: {}", dir, e);
            }
        }

        let source = self.paths.userdata(slot);
        self.host
            .bind_mount(&source, mount_point)
            .map_err(|e| VolumeError::MountFailure {
                mount_point: mount_point.to_string(),
                attempt: None,
                source: e,
            })
            .inspect_err(|e| log::error!("{}", e))?;

        log::info!("bound {} onto {}", source, mount_point);
        self.last_bound = Some(slot);
        if tracked {
            self.bound[index] = Some(slot);
        }
        Ok(())
    }

    fn mount_mtd(&mut self, volume: &Volume, mount_point: &str) -> VolumeResult<()> {
        if let Err(e) = self.host.scan_partitions() {
            log::warn!("failed to scan MTD partitions: {}", e);
        }

        let name = volume.device().unwrap_or_default();
        let partition = self
            .host
            .find_partition(name)
            .ok_or_else(|| VolumeError::PartitionNotFound {
                name: name.to_string(),
                mount_point: mount_point.to_string(),
            })?;

        self.host
            .mount_partition(&partition, mount_point, volume.fs_type.as_str(), false)
            .map_err(|e| VolumeError::MountFailure {
                mount_point: mount_point.to_string(),
                attempt: None,
                source: e,
            })
    }

    /// Tries device/fs-type combinations in fixed priority order; the first
    /// success wins, otherwise the last real attempt's failure is returned.
    fn mount_with_fallback(&mut self, volume: &Volume, mount_point: &str) -> VolumeResult<()> {
        let combos = [
            (
                FallbackCombo::Primary,
                volume.device(),
                Some(&volume.fs_type),
                volume.fs_options.as_deref(),
            ),
            (
                FallbackCombo::SecondDevice,
                volume.device2.as_deref(),
                Some(&volume.fs_type),
                volume.fs_options.as_deref(),
            ),
            (
                FallbackCombo::SecondFsType,
                volume.device(),
                volume.fs_type2.as_ref(),
                volume.fs_options2.as_deref(),
            ),
            (
                FallbackCombo::SecondBoth,
                volume.device2.as_deref(),
                volume.fs_type2.as_ref(),
                volume.fs_options2.as_deref(),
            ),
        ];

        let mut last_failure = None;

        for (combo, device, fs_type, options) in combos {
            let (Some(device), Some(fs_type)) = (device, fs_type) else {
                continue;
            };

            let attempt = MountAttempt {
                combo,
                device: device.to_string(),
                fs_type: fs_type.to_string(),
                options: options.map(str::to_string),
            };

            match self.try_mount(&attempt, mount_point) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!("failed to mount {} ({})", device, e);
                    last_failure = Some(VolumeError::MountFailure {
                        mount_point: mount_point.to_string(),
                        attempt: Some(attempt),
                        source: e,
                    });
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| VolumeError::MountFailure {
            mount_point: mount_point.to_string(),
            attempt: None,
            source: io::Error::new(io::ErrorKind::InvalidInput, "volume has no device"),
        }))
    }

    fn try_mount(&mut self, attempt: &MountAttempt, mount_point: &str) -> io::Result<()> {
        let Some(options) = attempt.options.as_deref() else {
            return self
                .host
                .mount(&attempt.device, mount_point, &attempt.fs_type);
        };

        let status = self.host.run(&[
            defs::MOUNT_BIN,
            "-t",
            &attempt.fs_type,
            "-o",
            options,
            &attempt.device,
            mount_point,
        ])?;

        match status {
            0 => Ok(()),
            code => Err(exit_status_error(defs::MOUNT_BIN, code)),
        }
    }

    /// Leaves it to the mount binary and whatever fstab it finds.
    fn mount_generic(&mut self, mount_point: &str) -> VolumeResult<()> {
        let failure = |source| VolumeError::MountFailure {
            mount_point: mount_point.to_string(),
            attempt: None,
            source,
        };

        match self.host.run(&[defs::MOUNT_BIN, mount_point]) {
            Ok(0) => Ok(()),
            Ok(code) => Err(failure(exit_status_error(defs::MOUNT_BIN, code))),
            Err(e) => Err(failure(e)),
        }
    }
}
