// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;

use crate::{
    core::{
        error::{VolumeError, VolumeResult},
        session::Session,
    },
    sys::Host,
};

fn ums_failure(path: &str, source: io::Error) -> VolumeError {
    VolumeError::UmsFailure {
        path: path.to_string(),
        source,
    }
}

impl<H: Host> Session<H> {
    /// Exports the volume at `path` through its USB mass storage lun.
    pub fn share_over_usb(&mut self, path: &str) -> VolumeResult<()> {
        let volume = self.resolve(path).inspect_err(|e| log::error!("{}", e))?;

        let (Some(lun), Some(device)) = (volume.lun.as_deref(), volume.device()) else {
            let e = ums_failure(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "volume has no lun file"),
            );
            log::error!("{}", e);
            return Err(e);
        };

        self.ensure_path_unmounted(&volume.mount_point)?;

        self.host
            .write_file(lun, device)
            .map_err(|e| ums_failure(path, e))
            .inspect_err(|e| log::error!("{}", e))?;

        log::info!("sharing {} over USB via {}", device, lun);
        Ok(())
    }

    /// Detaches every lun; the first write failure is returned after all were tried.
    pub fn unshare_usb(&mut self) -> VolumeResult<()> {
        let luns: Vec<(String, String)> = self
            .table
            .volumes()
            .iter()
            .filter_map(|v| Some((v.mount_point.to_string(), v.lun.as_deref()?.to_string())))
            .collect();

        let mut first_failure = None;
        for (mount_point, lun) in luns {
            if let Err(e) = self.host.write_file(&lun, "") {
                let e = ums_failure(&mount_point, e);
                log::error!("{}", e);
                first_failure.get_or_insert(e);
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use crate::{core::error::VolumeError, sys::fake::session};

    const UMS_FSTAB: &str = "/sdcard vfat /dev/block/mmcblk1p1 lun=/sys/lun0/file\n\
                             /emmc vfat /dev/block/mmcblk0p9 lun=/sys/lun1/file\n\
                             /cache ext4 /dev/block/cache\n";

    #[test]
    fn share_unmounts_and_writes_device() {
        let mut s = session(UMS_FSTAB);
        s.ensure_path_mounted("/sdcard").expect("mount");
        s.host.clear_calls();

        s.share_over_usb("/sdcard").expect("share");

        assert_eq!(
            s.host().calls(),
            ["umount /sdcard", "write /sys/lun0/file /dev/block/mmcblk1p1"]
        );
    }

    #[test]
    fn volume_without_lun_cannot_be_shared() {
        let mut s = session(UMS_FSTAB);
        assert!(matches!(
            s.share_over_usb("/cache"),
            Err(VolumeError::UmsFailure { path, .. }) if path == "/cache"
        ));
        assert!(s.host().calls().is_empty());
    }

    #[test]
    fn unshare_clears_every_lun() {
        let mut s = session(UMS_FSTAB);
        s.share_over_usb("/sdcard").expect("share");

        s.unshare_usb().expect("unshare");

        assert_eq!(s.host().file("/sys/lun0/file"), Some(""));
        assert_eq!(s.host().file("/sys/lun1/file"), Some(""));
    }
}
