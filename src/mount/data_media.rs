// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{core::session::Session, defs, sys::Host};

impl<H: Host> Session<H> {
    /// Points the data-media volume at `/data/media` with a symlink.
    ///
    /// `/data` must already be mounted; nothing is mounted here.
    pub(crate) fn setup_data_media(&mut self) {
        let Some(volume) = self.table.data_media_volume() else {
            return;
        };
        let link = volume.mount_point.to_string();

        if let Err(e) = self.host.remove_dir(&link) {
            log::debug!("rmdir {}: {}", link, e);
        }
        if let Err(e) = self.host.create_dir(defs::DATA_MEDIA_DIR, 0o755) {
            log::debug!("mkdir {}: {}", defs::DATA_MEDIA_DIR, e);
        }
        if let Err(e) = self.host.symlink(defs::DATA_MEDIA_DIR, &link) {
            log::debug!("symlink {} -> {}: {}", link, defs::DATA_MEDIA_DIR, e);
        }
    }

    /// Formats wipe around `/data/media` unless told to handle it.
    pub(crate) fn data_media_format_protected(&self) -> bool {
        self.table.is_data_media() && !self.handle_data_media
    }
}
