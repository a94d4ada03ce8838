// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! Formatting for volumes without native tooling in this crate.

use std::{fs, io, path::Path};

use walkdir::WalkDir;

use super::{CommandRunner, UnknownFormat};
use crate::core::error::exit_status_error;

/// Filesystem builder invocation for `fs_type` on `device`.
pub fn mkfs_command(device: &str, fs_type: &str) -> Vec<String> {
    match fs_type {
        "ext2" | "ext3" | "ext4" => ["mke2fs", "-F", "-t", fs_type, device]
            .map(str::to_string)
            .to_vec(),
        "vfat" => vec!["newfs_msdos".to_string(), device.to_string()],
        other => vec![format!("mkfs.{other}"), device.to_string()],
    }
}

/// Removes everything below `root` except the `keep` subtree, returning the
/// number of entries removed. Entries that cannot be removed are skipped.
pub fn wipe_tree(root: &Path, keep: Option<&Path>) -> usize {
    let kept = |path: &Path| keep.is_some_and(|k| path.starts_with(k) || k.starts_with(path));

    let mut removed = 0;
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if kept(path) {
            continue;
        }

        let result = if entry.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) => log::debug!("wipe: keeping {} [{}]", path.display(), e),
        }
    }
    removed
}

/// Builds a fresh filesystem when a type is known, otherwise wipes the mounted tree.
pub fn format_unknown<R: CommandRunner>(runner: &mut R, request: &UnknownFormat<'_>) -> io::Result<()> {
    let Some(fs_type) = request.fs_type else {
        let removed = wipe_tree(Path::new(request.path), request.keep.map(Path::new));
        log::info!("wiped {} ({} entries removed)", request.path, removed);
        return Ok(());
    };

    let device = request.device.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no device to format {} as {}", request.path, fs_type),
        )
    })?;

    let argv = mkfs_command(device, fs_type);
    let args: Vec<&str> = argv.iter().map(String::as_str).collect();

    log::info!("formatting {} as {}", device, fs_type);
    match runner.run(&args)? {
        0 => Ok(()),
        code => Err(exit_status_error(&argv[0], code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        commands: Vec<String>,
        status: i32,
    }

    impl CommandRunner for Recorder {
        fn run(&mut self, argv: &[&str]) -> io::Result<i32> {
            self.commands.push(argv.join(" "));
            Ok(self.status)
        }
    }

    #[test]
    fn builder_follows_fs_type() {
        assert_eq!(mkfs_command("/dev/block/a", "ext3"), ["mke2fs", "-F", "-t", "ext3", "/dev/block/a"]);
        assert_eq!(mkfs_command("/dev/block/b", "vfat"), ["newfs_msdos", "/dev/block/b"]);
        assert_eq!(mkfs_command("/dev/block/c", "f2fs"), ["mkfs.f2fs", "/dev/block/c"]);
    }

    #[test]
    fn typed_format_runs_builder() {
        let mut runner = Recorder::default();
        let request = UnknownFormat {
            device: Some("/dev/block/mmcblk1p1"),
            path: "/sdcard",
            fs_type: Some("vfat"),
            keep: None,
        };

        format_unknown(&mut runner, &request).expect("format");
        assert_eq!(runner.commands, ["newfs_msdos /dev/block/mmcblk1p1"]);

        runner.status = 1;
        assert!(format_unknown(&mut runner, &request).is_err());
    }

    #[test]
    fn typed_format_needs_device() {
        let mut runner = Recorder::default();
        let request = UnknownFormat {
            device: None,
            path: "/data1",
            fs_type: Some("bind"),
            keep: None,
        };

        assert!(format_unknown(&mut runner, &request).is_err());
        assert!(runner.commands.is_empty());
    }

    #[test]
    fn wipe_spares_kept_subtree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("app/lib")).expect("app");
        fs::write(root.join("app/lib/a.so"), "x").expect("a.so");
        fs::create_dir_all(root.join("media/0/DCIM")).expect("media");
        fs::write(root.join("media/0/DCIM/p.jpg"), "x").expect("p.jpg");
        fs::write(root.join("build.prop"), "x").expect("build.prop");

        let mut runner = Recorder::default();
        let keep = root.join("media");
        let request = UnknownFormat {
            device: None,
            path: root.to_str().expect("utf8 path"),
            fs_type: None,
            keep: keep.to_str(),
        };
        format_unknown(&mut runner, &request).expect("wipe");

        assert!(runner.commands.is_empty());
        assert!(!root.join("app").exists());
        assert!(!root.join("build.prop").exists());
        assert!(root.join("media/0/DCIM/p.jpg").exists());
        assert!(root.exists());
    }

    #[test]
    fn wipe_without_keep_empties_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("a/b")).expect("dirs");
        fs::write(dir.path().join("a/b/c"), "x").expect("file");

        assert_eq!(wipe_tree(dir.path(), None), 3);
        assert_eq!(fs::read_dir(dir.path()).expect("read_dir").count(), 0);
    }
}
