// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{borrow::Cow, fs, path::Path};

use crate::{
    conf::config::DualBootPaths,
    core::{
        error::ParseWarning,
        volume::{FsType, Text, Volume},
    },
    defs,
    sys::Host,
};

#[derive(Debug, Default)]
pub struct LoadReport {
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone)]
pub struct VolumeTable {
    volumes: Vec<Volume>,
}

impl Default for VolumeTable {
    fn default() -> Self {
        Self {
            volumes: vec![Volume::synthetic(
                defs::RAMDISK_MOUNT_POINT,
                FsType::Ramdisk,
            )],
        }
    }
}

impl VolumeTable {
    /// Loads the recovery fstab; an unreadable file leaves only the ramdisk.
    pub fn load_file<H: Host>(
        path: &Path,
        host: &mut H,
        paths: &DualBootPaths,
    ) -> (Self, LoadReport) {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, host, paths),
            Err(e) => {
                log::error!("failed to open {} ({})", path.display(), e);
                (Self::default(), LoadReport::default())
            }
        }
    }

    pub fn parse<H: Host>(content: &str, host: &mut H, paths: &DualBootPaths) -> (Self, LoadReport) {
        let mut table = Self::default();
        let mut report = LoadReport::default();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match table.parse_line(index + 1, line, host, paths) {
                Ok(()) => {}
                Err(warning) => {
                    log::error!("skipping malformed recovery.fstab line: {}", warning);
                    report.warnings.push(warning);
                }
            }
        }

        table.log_summary();

        (table, report)
    }

    fn parse_line<H: Host>(
        &mut self,
        line_no: usize,
        line: &str,
        host: &mut H,
        paths: &DualBootPaths,
    ) -> Result<(), ParseWarning> {
        let mut tokens = line.split_whitespace();
        let (Some(mount_point), Some(fs_type), Some(device)) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(ParseWarning::MissingField {
                line: line_no,
                text: line.trim_end().to_string(),
            });
        };

        // An optional second device, used when mounting the first one fails.
        let (device2, options) = match tokens.next() {
            Some(token) if token.starts_with('/') => (Some(token), tokens.next()),
            other => (None, other),
        };

        let mut volume = Volume {
            mount_point: Cow::Owned(mount_point.to_string()),
            fs_type: FsType::parse(fs_type),
            fs_type2: None,
            device: Some(Cow::Owned(device.to_string())),
            device2: device2.map(|d| Cow::Owned(d.to_string())),
            fs_options: None,
            fs_options2: None,
            lun: None,
            length: 0,
            stat: None,
        };

        if let Some(options) = options {
            apply_options(&mut volume, options, line_no)?;
        }

        let relocate_data = mount_point == defs::DATA_PATH && self.is_dual_system();
        if relocate_data {
            volume.device = Some(relocate_userdata(host, device, paths));
        }

        if let Some(node) = volume.device() {
            match host.stat_device(node) {
                Ok(stat) => volume.stat = Some(stat),
                Err(e) => log::error!("stat: {} on file {}", e, node),
            }
        }

        self.volumes.push(volume);

        if relocate_data && self.find(defs::DATA1_PATH).is_none() {
            self.volumes
                .push(Volume::synthetic(defs::DATA1_PATH, FsType::Bind));
        }

        Ok(())
    }

    fn log_summary(&self) {
        log::info!("recovery filesystem table");
        log::info!("=========================");
        for (i, v) in self.volumes.iter().enumerate() {
            log::info!(
                "  {} {} {} {} {} {}",
                i,
                v.mount_point,
                v.fs_type,
                v.device().unwrap_or("NULL"),
                v.device2.as_deref().unwrap_or("NULL"),
                v.length
            );
        }
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// First volume, in table order, whose mount point covers `path`.
    pub fn volume_for_path(&self, path: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.covers(path))
    }

    /// Exact mount point lookup.
    pub fn find(&self, mount_point: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.mount_point == mount_point)
    }

    pub fn is_dual_system(&self) -> bool {
        self.find(defs::SYSTEM1_PATH).is_some()
    }

    pub fn is_data_media(&self) -> bool {
        self.data_media_volume().is_some()
    }

    pub fn data_media_volume(&self) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.fs_type == FsType::DataMedia)
    }

    pub fn is_data_media_path(&self, path: &str) -> bool {
        self.volume_for_path(path)
            .is_some_and(|v| v.fs_type == FsType::DataMedia)
    }
}

fn apply_options(volume: &mut Volume, options: &str, line: usize) -> Result<(), ParseWarning> {
    for option in options.split(',').filter(|o| !o.is_empty()) {
        if let Some(value) = option.strip_prefix("length=") {
            volume.length = parse_length(value);
        } else if let Some(value) = option.strip_prefix("fstype2=") {
            // The named type takes over as primary; the line's own type becomes the fallback.
            let primary = std::mem::replace(&mut volume.fs_type, FsType::parse(value));
            volume.fs_type2 = Some(primary);
        } else if let Some(value) = option.strip_prefix("fs_options=") {
            volume.fs_options = Some(owned(value));
        } else if let Some(value) = option.strip_prefix("fs_options2=") {
            volume.fs_options2 = Some(owned(value));
        } else if let Some(value) = option.strip_prefix("lun=") {
            volume.lun = Some(owned(value));
        } else {
            return Err(ParseWarning::BadOption {
                line,
                option: option.to_string(),
            });
        }
    }
    Ok(())
}

/// Leading decimal digits with an optional sign; anything unparsable is 0.
fn parse_length(value: &str) -> i64 {
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().unwrap_or(0)
}

fn owned(value: &str) -> Text {
    Cow::Owned(value.to_string())
}

/// Moves the real userdata node out of the way so the generic name can be
/// reused, returning the reserved path the `/data` entry now points at.
fn relocate_userdata<H: Host>(host: &mut H, device: &str, paths: &DualBootPaths) -> Text {
    let resolved = host
        .read_link(device)
        .map(|target| target.to_string_lossy().into_owned())
        .unwrap_or_else(|_| device.to_string());

    if let Err(e) = host.rename(&resolved, &paths.moved_userdata_node) {
        log::error!(
            "could not move {} to {}: {}",
            resolved,
            paths.moved_userdata_node,
            e
        );
    }

    Cow::Owned(paths.moved_userdata_node.clone())
}
