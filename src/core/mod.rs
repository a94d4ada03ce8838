// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod activate;
pub mod dualboot;
pub mod error;
pub mod format;
pub mod session;
pub mod state;
pub mod table;
pub mod volume;

