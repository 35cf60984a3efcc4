/*
 * SPDX-FileCopyrightText: 2026 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

//! mbpatcher is primarily an application. The semver versioning covers the
//! CLI only and the Rust APIs may change in any release.
//!
//! Loading starts with a [`registry::Registry`], which is populated from the
//! patchinfo description files by [`loader`]. Matching a file against the
//! registry yields a [`patchinfo::PatchInfo`] and the [`patchinfo::RuleType`]
//! that applies, from which the [`patcher`] factory creates the plugins.

pub mod cli;
pub mod config;
pub mod device;
pub mod loader;
pub mod partconfig;
pub mod patcher;
pub mod patchinfo;
pub mod protocol;
pub mod registry;
pub mod util;
