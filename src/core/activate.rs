// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;

use crate::{
    core::{
        dualboot::{DualBootMode, select_slots},
        error::{VolumeError, VolumeResult},
        session::Session,
        volume::{DeviceStat, Volume},
    },
    defs,
    sys::Host,
};

impl<H: Host> Session<H> {
    /// Parses `selector` and activates it; nothing is touched when it is invalid.
    pub fn activate_selector(&mut self, selector: &str) -> VolumeResult<()> {
        let mode = selector
            .parse::<DualBootMode>()
            .inspect_err(|e| log::error!("{}", e))?;
        self.activate_system(mode)
    }

    /// Rewires the generic system/boot/radio nodes to the images chosen by
    /// `mode`, then unmounts `/data` so the next mount binds the right
    /// userdata subfolder.
    ///
    /// The mode is only recorded when every step succeeded. Swaps that
    /// already happened stay in place if a later step fails.
    pub fn activate_system(&mut self, mode: DualBootMode) -> VolumeResult<()> {
        let slots = select_slots(Some(mode));
        let mut first_failure = None;

        for (generic, alternate) in defs::DUAL_SYSTEM_PAIRS {
            let (Some(vol0), Some(vol1)) = (
                self.table.volume_for_path(generic).cloned(),
                self.table.volume_for_path(alternate).cloned(),
            ) else {
                log::debug!("no {} / {} pair, skipping", generic, alternate);
                continue;
            };

            let pair = [&vol0, &vol1];
            let sources = slots.map(|slot| pair[slot.index()]);

            for (dest, source) in pair.into_iter().zip(sources) {
                if let Err(e) = self.replace_device_node(dest, source.stat) {
                    log::error!("{}", e);
                    first_failure.get_or_insert(e);
                    break;
                }
            }
        }

        if let Err(e) = self.ensure_path_unmounted(defs::DATA_PATH) {
            log::error!("could not unmount {}!", defs::DATA_PATH);
            first_failure.get_or_insert(e);
        }

        if let Some(e) = first_failure {
            return Err(e);
        }

        log::info!("activated {}", mode);
        self.active_mode = Some(mode);
        Ok(())
    }

    /// Recreates `dest`'s device node with another volume's identity.
    fn replace_device_node(&mut self, dest: &Volume, stat: Option<DeviceStat>) -> VolumeResult<()> {
        let Some(device) = dest.device() else {
            return Err(VolumeError::swap(
                &dest.mount_point,
                io::Error::new(io::ErrorKind::NotFound, "volume has no device"),
            ));
        };
        let Some(stat) = stat else {
            return Err(VolumeError::swap(
                device,
                io::Error::new(io::ErrorKind::NotFound, "no stat snapshot for source volume"),
            ));
        };

        let node = self
            .host
            .read_link(device)
            .map(|target| target.to_string_lossy().into_owned())
            .unwrap_or_else(|_| device.to_string());

        self.ensure_path_unmounted(&dest.mount_point)?;

        self.host
            .remove_node(&node)
            .map_err(|e| VolumeError::swap(&node, e))?;
        self.host
            .make_node(&node, &stat)
            .map_err(|e| VolumeError::swap(&node, e))?;

        log::debug!(
            "{} now {}:{} ({:o})",
            node,
            stat.major(),
            stat.minor(),
            stat.mode
        );
        Ok(())
    }
}
