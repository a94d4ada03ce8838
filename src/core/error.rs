// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! Failure kinds surfaced by volume operations.
//!
//! Every mount/unmount/format/activate call returns one of these and logs it;
//! none of them aborts the process. Parse problems are separate
//! ([`ParseWarning`]) because they only ever drop a single fstab line.

use std::{fmt, io};

use thiserror::Error;

pub type VolumeResult<T> = Result<T, VolumeError>;

/// Position of a mount attempt in the four-step fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackCombo {
    /// `(device, fs_type, fs_options)`
    Primary,
    /// `(device2, fs_type, fs_options)`
    SecondDevice,
    /// `(device, fs_type2, fs_options2)`
    SecondFsType,
    /// `(device2, fs_type2, fs_options2)`
    SecondBoth,
}

impl fmt::Display for FallbackCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "device/fs_type",
            Self::SecondDevice => "device2/fs_type",
            Self::SecondFsType => "device/fs_type2",
            Self::SecondBoth => "device2/fs_type2",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountAttempt {
    pub combo: FallbackCombo,
    pub device: String,
    pub fs_type: String,
    pub options: Option<String>,
}

impl fmt::Display for MountAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} as {}", self.combo, self.device, self.fs_type)?;
        if let Some(options) = &self.options {
            write!(f, " -o {options}")?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStage {
    Refused,
    Unmount,
    Locate,
    Open,
    Erase,
    Close,
    Build,
    Delegate,
}

impl fmt::Display for FormatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Refused => "refused",
            Self::Unmount => "unmount",
            Self::Locate => "locate",
            Self::Open => "open",
            Self::Erase => "erase",
            Self::Close => "close",
            Self::Build => "build",
            Self::Delegate => "delegate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("unknown volume for path [{0}]")]
    VolumeNotFound(String),

    #[error("failed to scan mounted volumes: {0}")]
    ScanFailure(#[source] io::Error),

    #[error("failed to find \"{name}\" partition to mount at \"{mount_point}\"")]
    PartitionNotFound { name: String, mount_point: String },

    /// Only the last attempted fallback combination is reported.
    #[error("failed to mount {mount_point}{}: {source}", describe_attempt(.attempt))]
    MountFailure {
        mount_point: String,
        attempt: Option<MountAttempt>,
        #[source]
        source: io::Error,
    },

    #[error("failed to unmount {mount_point}: {source}")]
    UnmountFailure {
        mount_point: String,
        #[source]
        source: io::Error,
    },

    #[error("format of {path} failed at {stage} stage: {source}")]
    FormatFailure {
        path: String,
        stage: FormatStage,
        #[source]
        source: io::Error,
    },

    #[error("unsupported system selector: {0}")]
    UnsupportedSelector(String),

    #[error("could not replace device node {node}: {source}")]
    DeviceNodeSwapFailure {
        node: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot share {path} over USB: {source}")]
    UmsFailure {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl VolumeError {
    pub fn format(path: &str, stage: FormatStage, source: impl Into<io::Error>) -> Self {
        Self::FormatFailure {
            path: path.to_string(),
            stage,
            source: source.into(),
        }
    }

    pub fn unmount(mount_point: &str, source: impl Into<io::Error>) -> Self {
        Self::UnmountFailure {
            mount_point: mount_point.to_string(),
            source: source.into(),
        }
    }

    pub fn swap(node: &str, source: impl Into<io::Error>) -> Self {
        Self::DeviceNodeSwapFailure {
            node: node.to_string(),
            source: source.into(),
        }
    }
}

/// Non-fatal fstab problem; the offending line is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    #[error("line {line}: missing mount point, fs type or device: {text}")]
    MissingField { line: usize, text: String },

    #[error("line {line}: bad option \"{option}\"")]
    BadOption { line: usize, option: String },
}

fn describe_attempt(attempt: &Option<MountAttempt>) -> String {
    attempt
        .as_ref()
        .map(|a| format!(" via {a}"))
        .unwrap_or_default()
}

/// Exit status of an external tool turned into an error.
pub fn exit_status_error(program: &str, code: i32) -> io::Error {
    io::Error::other(format!("{program} exited with status {code}"))
}
