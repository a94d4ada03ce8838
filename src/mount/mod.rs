// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod data_media;
pub mod mounter;
pub mod umount_mgr;
pub mod ums;
