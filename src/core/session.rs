// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{
    conf::config::{Config, DualBootPaths},
    core::{
        dualboot::{DualBootMode, SystemSlot},
        error::{VolumeError, VolumeResult},
        state::RuntimeState,
        table::VolumeTable,
        volume::Volume,
    },
    defs,
    sys::Host,
};

/// Everything the volume operations share for the lifetime of the recovery
/// process: the volume table, the dual-boot markers and the host primitives.
///
/// Operations are not reentrant across threads; the recovery control loop
/// owns exactly one session.
pub struct Session<H: Host> {
    pub(crate) host: H,
    pub(crate) table: VolumeTable,
    pub(crate) paths: DualBootPaths,
    pub(crate) active_mode: Option<DualBootMode>,
    pub(crate) last_bound: Option<SystemSlot>,
    /// Subfolder currently bound onto `/data` and `/data1`, by data index.
    pub(crate) bound: [Option<SystemSlot>; 2],
    pub(crate) true_dual_boot: bool,
    pub(crate) handle_data_media: bool,
    pub(crate) handle_true_dual_boot: bool,
}

impl<H: Host> Session<H> {
    pub fn new(host: H, table: VolumeTable, paths: DualBootPaths) -> Self {
        Self {
            host,
            table,
            paths,
            active_mode: None,
            last_bound: None,
            bound: [None; 2],
            true_dual_boot: false,
            handle_data_media: false,
            handle_true_dual_boot: false,
        }
    }

    /// Loads the fstab named by `config` and applies its switches.
    pub fn from_config(mut host: H, config: &Config) -> Self {
        let (table, report) = VolumeTable::load_file(&config.fstab, &mut host, &config.dual_boot);
        if !report.warnings.is_empty() {
            log::warn!("{} fstab line(s) ignored", report.warnings.len());
        }

        let mut session = Self::new(host, table, config.dual_boot.clone());
        session.set_true_dual_boot(config.true_dual_boot);
        session.handle_data_media_format(config.handle_data_media_format);
        session.handle_true_dual_boot_format(config.handle_true_dual_boot_format);
        session
    }

    pub fn restore_state(&mut self, state: &RuntimeState) {
        self.active_mode = state.active_dual_boot_mode;
        self.last_bound = state.last_bound_data_subfolder;
        self.bound = state.bound_data_subfolders;
    }

    pub fn snapshot_state(&self) -> RuntimeState {
        RuntimeState::new(self.active_mode, self.last_bound, self.bound)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn volume_count(&self) -> usize {
        self.table.len()
    }

    pub fn volumes(&self) -> &[Volume] {
        self.table.volumes()
    }

    pub fn is_dual_system(&self) -> bool {
        self.table.is_dual_system()
    }

    pub fn is_data_media(&self) -> bool {
        self.table.is_data_media()
    }

    pub fn is_data_media_path(&self, path: &str) -> bool {
        self.table.is_data_media_path(path)
    }

    pub fn active_dual_boot_mode(&self) -> Option<DualBootMode> {
        self.active_mode
    }

    pub fn last_bound_data_subfolder(&self) -> Option<SystemSlot> {
        self.last_bound
    }

    pub fn set_true_dual_boot(&mut self, enabled: bool) {
        self.true_dual_boot = enabled;
    }

    pub fn handle_data_media_format(&mut self, handle: bool) {
        self.handle_data_media = handle;
    }

    pub fn handle_true_dual_boot_format(&mut self, handle: bool) {
        self.handle_true_dual_boot = handle;
    }

    /// Dual-system device with the data root kept mounted across system switches.
    pub fn is_true_dual_boot(&self) -> bool {
        self.true_dual_boot && self.table.is_dual_system()
    }

    pub(crate) fn resolve(&self, path: &str) -> VolumeResult<Volume> {
        self.table
            .volume_for_path(path)
            .cloned()
            .ok_or_else(|| VolumeError::VolumeNotFound(path.to_string()))
    }
}

/// Logical data paths of the two systems: `/data` is index 0, `/data1` index 1.
pub(crate) fn data_index(path: &str) -> Option<usize> {
    match path {
        defs::DATA_PATH => Some(0),
        defs::DATA1_PATH => Some(1),
        _ => None,
    }
}

/// Plain string prefix test, so `/data1` and `/data_root` count as well.
pub(crate) fn under_data(path: &str) -> bool {
    path.starts_with(defs::DATA_PATH)
}
