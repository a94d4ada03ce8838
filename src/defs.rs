// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

// Recovery volume table
pub const FSTAB_FILE: &str = "/etc/recovery.fstab";
pub const CONFIG_FILE: &str = "/etc/recovery-volumes.toml";

// Everything below /tmp lives on the ramdisk and dies with the recovery session
pub const RAMDISK_MOUNT_POINT: &str = "/tmp";
pub const LOG_FILE: &str = "/tmp/recovery.log";
pub const STATE_FILE: &str = "/tmp/.recovery-volumes.json";

// Data partition and its data-media view
pub const DATA_PATH: &str = "/data";
pub const DATA1_PATH: &str = "/data1";
pub const DATA_MEDIA_DIR: &str = "/data/media";
pub const SD_EXT_PATH: &str = "/sd-ext";

// Dual-system layout
pub const SYSTEM1_PATH: &str = "/system1";
pub const DATA_ROOT: &str = "/data_root";
pub const USERDATA_MOVED_NODE: &str = "/dev/userdata_moved";

// Generic node / alternate node pairs swapped by the system activator
pub const DUAL_SYSTEM_PAIRS: [(&str, &str); 3] = [
    ("/system", "/system1"),
    ("/boot", "/boot1"),
    ("/radio", "/radio1"),
];

// MTD
pub const PROC_MTD: &str = "/proc/mtd";
pub const MTD_CHAR_DIR: &str = "/dev/mtd";
pub const MTD_BLOCK_DIR: &str = "/dev/block";

// External tools
pub const MAKE_EXT4FS_BIN: &str = "make_ext4fs";
pub const MOUNT_BIN: &str = "mount";
