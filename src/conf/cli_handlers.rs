// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    conf::{
        cli::{Cli, Commands},
        config::Config,
    },
    core::{
        dualboot::{DualBootMode, SystemSlot},
        session::Session,
        state::RuntimeState,
        volume::Volume,
    },
    defs,
    sys::{Host, LinuxHost},
};

#[derive(Serialize)]
struct StatusJson {
    volume_count: usize,
    dual_system: bool,
    data_media: bool,
    true_dual_boot: bool,
    active_dual_boot_mode: Option<DualBootMode>,
    last_bound_data_subfolder: Option<SystemSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_media_path: Option<bool>,
}

/// Config file merged with the command line switches.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path).with_context(|| {
            format!(
                "Failed to load config from custom path: {}",
                config_path.display()
            )
        })?
    } else {
        match Config::load_default() {
            Ok(config) => config,
            Err(e) => {
                let is_not_found = e
                    .root_cause()
                    .downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false);

                if !is_not_found {
                    return Err(e).context(format!(
                        "Failed to load default config from {}",
                        defs::CONFIG_FILE
                    ));
                }
                Config::default()
            }
        }
    };

    config.merge_with_cli(
        cli.fstab.clone(),
        cli.verbose,
        cli.true_dual_boot,
        cli.handle_data_media_format,
        cli.handle_true_dual_boot_format,
    );

    Ok(config)
}

pub fn handle_gen_config(output: &Path) -> Result<()> {
    Config::default()
        .save_to_file(output)
        .with_context(|| format!("Failed to save generated config to {}", output.display()))
}

pub fn handle_show_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let json = serde_json::to_string(&config).context("Failed to serialize config to JSON")?;

    println!("{}", json);

    Ok(())
}

/// Session over the real device, with the markers of earlier invocations.
pub fn open_session(config: &Config) -> Session<LinuxHost> {
    let mut session = Session::from_config(LinuxHost::new(), config);
    session.restore_state(&RuntimeState::load(&config.state_file));
    session
}

pub fn persist_state<H: Host>(session: &Session<H>, config: &Config) {
    if let Err(e) = session.snapshot_state().save(&config.state_file) {
        tracing::warn!("Failed to save runtime state: {:#}", e);
    }
}

/// Runs one volume command; config commands are handled before a session exists.
pub fn dispatch<H: Host>(session: &mut Session<H>, command: &Commands) -> Result<()> {
    match command {
        Commands::Volumes => handle_volumes(session),
        Commands::Status { path } => handle_status(session, path.as_deref()),
        Commands::Mount { path, at } => session
            .ensure_path_mounted_at(path, at.as_deref())
            .with_context(|| format!("Failed to mount {}", path)),
        Commands::Umount { path } => session
            .ensure_path_unmounted(path)
            .with_context(|| format!("Failed to unmount {}", path)),
        Commands::Format { path } => session
            .format_volume(path)
            .with_context(|| format!("Failed to format {}", path)),
        Commands::Activate { selector } => session
            .activate_selector(selector)
            .with_context(|| format!("Failed to activate system {}", selector)),
        Commands::UmsShare { path } => session
            .share_over_usb(path)
            .with_context(|| format!("Failed to share {} over USB", path)),
        Commands::UmsUnshare => session
            .unshare_usb()
            .context("Failed to stop USB mass storage"),
        Commands::GenConfig { .. } | Commands::ShowConfig => Ok(()),
    }
}

fn handle_volumes<H: Host>(session: &Session<H>) -> Result<()> {
    let volumes: &[Volume] = session.volumes();
    let json = serde_json::to_string(volumes).context("Failed to serialize volume table")?;

    println!("{}", json);

    Ok(())
}

fn status_report<H: Host>(session: &Session<H>, path: Option<&str>) -> StatusJson {
    StatusJson {
        volume_count: session.volume_count(),
        dual_system: session.is_dual_system(),
        data_media: session.is_data_media(),
        true_dual_boot: session.is_true_dual_boot(),
        active_dual_boot_mode: session.active_dual_boot_mode(),
        last_bound_data_subfolder: session.last_bound_data_subfolder(),
        data_media_path: path.map(|p| session.is_data_media_path(p)),
    }
}

fn handle_status<H: Host>(session: &Session<H>, path: Option<&str>) -> Result<()> {
    let json = serde_json::to_string(&status_report(session, path))
        .context("Failed to serialize status")?;

    println!("{}", json);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::fake::{DUAL_FSTAB, session};

    #[test]
    fn status_reflects_session() {
        let mut s = session(DUAL_FSTAB);
        s.set_true_dual_boot(true);
        s.activate_system(DualBootMode::Interchanged).expect("activate");

        let json = serde_json::to_value(status_report(&s, Some("/sdcard"))).expect("json");

        assert_eq!(json["volume_count"], 8);
        assert_eq!(json["dual_system"], true);
        assert_eq!(json["data_media"], false);
        assert_eq!(json["true_dual_boot"], true);
        assert_eq!(json["active_dual_boot_mode"], "interchanged");
        assert!(json["last_bound_data_subfolder"].is_null());
        assert_eq!(json["data_media_path"], false);
    }

    #[test]
    fn dispatch_reports_volume_errors_with_context() {
        let mut s = session("/cache ext4 /dev/block/cache");

        let err = dispatch(&mut s, &Commands::Umount { path: "/tmp".to_string() })
            .expect_err("ramdisk");

        assert!(format!("{:#}", err).starts_with("Failed to unmount /tmp"));
    }

    #[test]
    fn dispatch_mounts_at_override() {
        let mut s = session("/cache ext4 /dev/block/cache");

        dispatch(
            &mut s,
            &Commands::Mount {
                path: "/cache".to_string(),
                at: Some("/mnt/cache".to_string()),
            },
        )
        .expect("mount");

        assert!(s.host().is_mounted("/mnt/cache"));
    }
}
