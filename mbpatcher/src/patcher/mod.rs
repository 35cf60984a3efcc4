// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Plugin interfaces and the factory that instantiates them.
//!
//! Every plugin family has a closed set of identifiers ([`PatcherKind`],
//! [`AutoPatcherKind`], [`RamdiskPatcherKind`]). The `create_*` functions
//! parse an identifier string and return [`None`] when it is unknown, which
//! callers should treat as the feature being unavailable.

pub mod auto;
pub mod primary;
pub mod ramdisk;

use std::{collections::BTreeMap, io, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::{
    partconfig::PartitionConfig,
    patchinfo::{AutoPatcherArgs, RuleType},
    registry::Registry,
};

pub use self::{
    auto::AutoPatcherKind, primary::PatcherKind, ramdisk::RamdiskPatcherKind,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} requires the {arg:?} argument")]
    MissingArgument { kind: &'static str, arg: &'static str },
    #[error("Patchinfo not found: {0:?}")]
    UnknownPatchInfo(String),
    #[error("Device not found: {0:?}")]
    UnknownDevice(String),
    #[error("Ramdisk does not contain {0:?}; is it for the right device?")]
    MissingRamdiskFile(String),
    #[error("Failed to read file: {0:?}")]
    File(PathBuf, #[source] io::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Unknown plugin identifier.
#[derive(Debug, Error)]
#[error("Unknown plugin identifier: {0:?}")]
pub struct UnknownKind(pub String);

/// Context describing the file being patched. Other objects are referenced by
/// their identifiers in the [`Registry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    /// Codename of the target device.
    pub device: String,
    /// ID of the matched patchinfo.
    pub patch_info: String,
    /// The rule bundle within the patchinfo that applies to [`Self::path`].
    pub rule_type: RuleType,
    /// ID of the partition configuration being installed to.
    pub partconfig: String,
}

/// A primary patcher, which drives the whole patching process for a file.
pub trait Patcher {
    fn kind(&self) -> PatcherKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Partition configurations that this patcher is able to install to.
    fn partition_configs(&self) -> Vec<PartitionConfig> {
        primary::partition_configs(self.kind())
    }
}

/// A patcher for individual files inside a ROM zip.
pub trait AutoPatcher {
    fn kind(&self) -> AutoPatcherKind;

    fn args(&self) -> &AutoPatcherArgs;

    /// Paths, relative to the root of the zip, of the files that this
    /// auto-patcher edits.
    fn existing_files(&self) -> Result<Vec<String>>;
}

/// Handle to an in-memory ramdisk archive. The archive is owned by the caller.
pub trait RamdiskArchive {
    fn exists(&self, path: &str) -> bool;

    fn contents(&self, path: &str) -> Option<&[u8]>;

    /// Add a new entry or replace the data of an existing one.
    fn set_contents(&mut self, path: &str, data: Vec<u8>);

    /// Returns false if `from` does not exist.
    fn rename(&mut self, from: &str, to: &str) -> bool;
}

impl RamdiskArchive for BTreeMap<String, Vec<u8>> {
    fn exists(&self, path: &str) -> bool {
        self.contains_key(path)
    }

    fn contents(&self, path: &str) -> Option<&[u8]> {
        self.get(path).map(|d| d.as_slice())
    }

    fn set_contents(&mut self, path: &str, data: Vec<u8>) {
        self.insert(path.to_owned(), data);
    }

    fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.remove(from) {
            Some(data) => {
                self.insert(to.to_owned(), data);
                true
            }
            None => false,
        }
    }
}

/// A patcher that modifies the boot image's ramdisk.
pub trait RamdiskPatcher {
    fn kind(&self) -> RamdiskPatcherKind;

    fn patch_ramdisk(&mut self) -> Result<()>;
}

fn parse_kind<T: Copy>(all: &[T], id_of: impl Fn(T) -> &'static str, id: &str) -> Option<T> {
    all.iter().copied().find(|k| id_of(*k) == id)
}

impl FromStr for PatcherKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_kind(&Self::ALL, Self::id, s).ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

impl FromStr for AutoPatcherKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_kind(&Self::ALL, Self::id, s).ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

impl FromStr for RamdiskPatcherKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_kind(&Self::ALL, Self::id, s).ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

pub fn create_patcher(id: &str) -> Option<Box<dyn Patcher>> {
    let kind = id.parse::<PatcherKind>().ok()?;

    Some(match kind {
        PatcherKind::MultiBoot => Box::new(primary::MultiBootPatcher),
        PatcherKind::PrimaryUpgrade => Box::new(primary::PrimaryUpgradePatcher),
        PatcherKind::SyncdaemonUpdate => Box::new(primary::SyncdaemonUpdatePatcher),
    })
}

pub fn create_auto_patcher<'a>(
    registry: &'a Registry,
    id: &str,
    info: &'a FileInfo,
    args: &AutoPatcherArgs,
) -> Option<Box<dyn AutoPatcher + 'a>> {
    let kind = id.parse::<AutoPatcherKind>().ok()?;

    Some(match kind {
        AutoPatcherKind::PatchFile => {
            Box::new(auto::PatchFilePatcher::new(registry, info, args.clone()))
        }
        k @ (AutoPatcherKind::DalvikCache
        | AutoPatcherKind::GoogleEdition
        | AutoPatcherKind::SlimAromaBundledMount
        | AutoPatcherKind::Imperium
        | AutoPatcherKind::NegaliteNoWipeData
        | AutoPatcherKind::TriForceFixAroma
        | AutoPatcherKind::TriForceFixUpdate
        | AutoPatcherKind::NoobdevMultiBoot
        | AutoPatcherKind::NoobdevSystemProp
        | AutoPatcherKind::Standard) => {
            Box::new(auto::ScriptPatcher::new(k, info, args.clone()))
        }
    })
}

pub fn create_ramdisk_patcher<'a>(
    registry: &'a Registry,
    id: &str,
    info: &'a FileInfo,
    archive: &'a mut dyn RamdiskArchive,
) -> Option<Box<dyn RamdiskPatcher + 'a>> {
    let kind = id.parse::<RamdiskPatcherKind>().ok()?;

    Some(Box::new(ramdisk::DeviceRamdiskPatcher::new(
        kind, registry, info, archive,
    )))
}

/// Display name of a primary patcher, or an empty string if `id` is unknown.
pub fn patcher_name(id: &str) -> &'static str {
    id.parse::<PatcherKind>().map_or("", |k| k.name())
}
