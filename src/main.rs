// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

mod conf;
mod core;
mod defs;
mod mount;
mod sys;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use conf::{
    cli::{Cli, Commands},
    cli_handlers,
};
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::GenConfig { output } => return cli_handlers::handle_gen_config(output),
        Commands::ShowConfig => return cli_handlers::handle_show_config(&cli),
        _ => {}
    }

    let config = cli_handlers::load_config(&cli)?;

    let _log_guard = utils::init_logging(config.verbose, Some(&config.log_file))
        .context("Failed to initialize logging")?;

    tracing::debug!(
        ">> recovery-volumes {} (fstab {})",
        env!("CARGO_PKG_VERSION"),
        config.fstab.display()
    );

    let mut session = cli_handlers::open_session(&config);

    let result = cli_handlers::dispatch(&mut session, &cli.command);

    cli_handlers::persist_state(&session, &config);

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }

    result
}
