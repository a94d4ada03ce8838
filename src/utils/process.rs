// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    io,
    process::{Command, Stdio},
};

use crate::sys::CommandRunner;

/// Runs external tools with `std::process`, logging their output at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, argv: &[&str]) -> io::Result<i32> {
        let Some((program, args)) = argv.split_first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
        };

        log::debug!("exec: {}", argv.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let log_lines = |bytes: &[u8]| {
            let s = String::from_utf8_lossy(bytes);
            for line in s.lines() {
                if !line.trim().is_empty() {
                    log::debug!("{}: {}", program, line);
                }
            }
        };

        log_lines(&output.stdout);
        log_lines(&output.stderr);

        // Killed by a signal counts as a failure.
        Ok(output.status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_is_reported() {
        let mut runner = SystemRunner;
        assert_eq!(runner.run(&["sh", "-c", "exit 0"]).expect("sh"), 0);
        assert_eq!(runner.run(&["sh", "-c", "exit 3"]).expect("sh"), 3);
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut runner = SystemRunner;
        assert!(runner.run(&[]).is_err());
    }
}
