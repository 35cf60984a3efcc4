// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! The registry owns every device, patchinfo and partition configuration.
//! Objects refer to each other by their identifiers and lookups return
//! borrowed references.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::{Config, Directories},
    device::{self, Device},
    loader::{self, Diagnostic},
    partconfig::PartitionConfig,
    patcher::{
        self, AutoPatcher, AutoPatcherKind, FileInfo, Patcher, PatcherKind, RamdiskArchive,
        RamdiskPatcher, RamdiskPatcherKind,
    },
    patchinfo::{AutoPatcherArgs, PatchInfo},
    util,
};

/// Patchinfos under these prefixes apply to every device.
const INCLUDE_DIRS: [&str; 2] = ["Google_Apps", "Other"];

#[derive(Debug, Error)]
pub enum Error {
    #[error("Device codename is already registered: {0:?}")]
    DuplicateDevice(String),
    #[error("Failed to load patchinfos")]
    Loader(#[from] loader::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Registry {
    directories: Directories,
    devices: Vec<Device>,
    patch_infos: Vec<PatchInfo>,
    partition_configs: Vec<PartitionConfig>,
}

impl Registry {
    /// Create a registry with the built-in devices and partition
    /// configurations. No patchinfos are loaded.
    pub fn new(directories: Directories) -> Self {
        let partition_configs = PatcherKind::ALL
            .into_iter()
            .flat_map(patcher::primary::partition_configs)
            .collect();

        Self {
            directories,
            devices: device::builtin_devices(),
            patch_infos: vec![],
            partition_configs,
        }
    }

    /// Create a registry from a config file's directories and extra devices.
    pub fn from_config(config: &Config, default_data_dir: &Path) -> Result<Self> {
        let mut registry = Self::new(config.directories(default_data_dir));

        for device in config.devices() {
            registry.add_device(device)?;
        }

        Ok(registry)
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    pub fn directories_mut(&mut self) -> &mut Directories {
        &mut self.directories
    }

    /// Clear the data directory, the directory overrides and all devices.
    /// Loaded patchinfos are kept.
    pub fn reset(&mut self) {
        self.directories.set_data_dir("");
        self.directories.clear_overrides();
        self.devices.clear();
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, codename: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.codename() == codename)
    }

    pub fn add_device(&mut self, device: Device) -> Result<()> {
        if self.device(device.codename()).is_some() {
            return Err(Error::DuplicateDevice(device.codename().to_owned()));
        }

        debug!("Registered device: {}", device.codename());
        self.devices.push(device);

        Ok(())
    }

    pub fn patch_infos(&self) -> &[PatchInfo] {
        &self.patch_infos
    }

    pub fn patch_info(&self, id: &str) -> Option<&PatchInfo> {
        self.patch_infos.iter().find(|i| i.id() == id)
    }

    pub fn add_patch_info(&mut self, info: PatchInfo) -> Result<()> {
        if self.patch_info(info.id()).is_some() {
            return Err(loader::Error::DuplicatePatchInfo(info.id().to_owned()).into());
        }

        self.patch_infos.push(info);

        Ok(())
    }

    /// Load every description file from the patchinfos directory. On failure,
    /// patchinfos loaded before the failing file stay registered.
    pub fn load_patch_infos(&mut self) -> Result<Vec<Diagnostic>> {
        let root = self.directories.patchinfos();
        debug!("Loading patchinfos from {root:?}");

        let diagnostics = loader::load_dir(&root, &mut self.patch_infos)?;

        debug!(
            "Loaded {} patchinfos with {} warnings",
            self.patch_infos.len(),
            diagnostics.len(),
        );

        Ok(diagnostics)
    }

    /// Patchinfos applicable to `device`, in registry order. This includes
    /// the device's own patchinfos and those from the shared include
    /// directories.
    pub fn patch_infos_for_device(&self, device: &Device) -> Vec<&PatchInfo> {
        self.patch_infos
            .iter()
            .filter(|i| {
                i.id().starts_with(device.codename())
                    || INCLUDE_DIRS.iter().any(|d| i.id().starts_with(*d))
            })
            .collect()
    }

    /// Find the first applicable patchinfo that matches the base name of
    /// `file_name`.
    pub fn find_matching_patch_info(&self, codename: &str, file_name: &str) -> Option<&PatchInfo> {
        let device = self.device(codename)?;

        if file_name.is_empty() {
            return None;
        }

        let info = self
            .patch_infos_for_device(device)
            .into_iter()
            .find(|i| i.matches(file_name));

        match info {
            Some(i) => debug!("{file_name:?} matched patchinfo {}", i.id()),
            None => debug!("{file_name:?} matched no patchinfo for {codename}"),
        }

        info
    }

    pub fn partition_configs(&self) -> &[PartitionConfig] {
        &self.partition_configs
    }

    pub fn partition_config(&self, id: &str) -> Option<&PartitionConfig> {
        self.partition_configs.iter().find(|c| c.id == id)
    }

    /// Paths of the init binaries, relative to the inits directory and sorted.
    /// If the directory cannot be read, a warning is logged and nothing is
    /// returned.
    pub fn init_binaries(&self) -> Vec<String> {
        let dir = self.directories.inits();

        let walked = match util::walk_files(&dir) {
            Ok(w) => w,
            Err(e) => {
                warn!("Failed to list init binaries in {dir:?}: {e}");
                return vec![];
            }
        };

        for e in &walked.skipped {
            warn!("Skipping unreadable init binary entry: {e}");
        }

        walked
            .files
            .iter()
            .filter_map(|p| p.strip_prefix(&dir).ok()?.to_str())
            .map(|p| p.to_owned())
            .collect()
    }

    pub fn patchers(&self) -> Vec<&'static str> {
        PatcherKind::ALL.iter().map(|k| k.id()).collect()
    }

    pub fn auto_patchers(&self) -> Vec<&'static str> {
        AutoPatcherKind::ALL.iter().map(|k| k.id()).collect()
    }

    pub fn ramdisk_patchers(&self) -> Vec<&'static str> {
        RamdiskPatcherKind::ALL.iter().map(|k| k.id()).collect()
    }

    pub fn patcher_name(&self, id: &str) -> &'static str {
        patcher::patcher_name(id)
    }

    /// Gather the context needed to patch `path` for `codename` with the
    /// partition configuration `partconfig`. Returns [`None`] if the device
    /// is unknown or no patchinfo matches.
    pub fn file_info(&self, path: &Path, codename: &str, partconfig: &str) -> Option<FileInfo> {
        let file_name = path.to_str()?;
        let info = self.find_matching_patch_info(codename, file_name)?;

        Some(FileInfo {
            path: path.to_owned(),
            device: codename.to_owned(),
            patch_info: info.id().to_owned(),
            rule_type: info.rule_type_for(file_name),
            partconfig: partconfig.to_owned(),
        })
    }

    pub fn create_patcher(&self, id: &str) -> Option<Box<dyn Patcher>> {
        patcher::create_patcher(id)
    }

    pub fn create_auto_patcher<'a>(
        &'a self,
        id: &str,
        info: &'a FileInfo,
        args: &AutoPatcherArgs,
    ) -> Option<Box<dyn AutoPatcher + 'a>> {
        patcher::create_auto_patcher(self, id, info, args)
    }

    pub fn create_ramdisk_patcher<'a>(
        &'a self,
        id: &str,
        info: &'a FileInfo,
        archive: &'a mut dyn RamdiskArchive,
    ) -> Option<Box<dyn RamdiskPatcher + 'a>> {
        patcher::create_ramdisk_patcher(self, id, info, archive)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_matches::assert_matches;

    use super::*;
    use crate::device::SelinuxMode;

    fn patch_info(id: &str, regexes: &[&str]) -> PatchInfo {
        let mut info = PatchInfo::new();
        info.set_id(id);
        for r in regexes {
            info.add_regex(*r);
        }
        info
    }

    #[test]
    fn builtin_state() {
        let registry = Registry::new(Directories::new("/data"));

        assert_eq!(registry.devices().len(), 7);
        assert_eq!(registry.device("hlte").unwrap().name(), "Samsung Galaxy Note 3");
        assert!(registry.device("mako").is_none());
        assert!(registry.partition_config("multi-slot-2").is_some());
        assert!(registry.partition_config("primaryupgrade").is_some());
        assert_eq!(registry.version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn duplicate_device() {
        let mut registry = Registry::new(Directories::new("/data"));

        registry
            .add_device(Device::new("mako", "Nexus 4", SelinuxMode::Unchanged))
            .unwrap();
        assert_matches!(
            registry.add_device(Device::new("jflte", "Dup", SelinuxMode::Unchanged)),
            Err(Error::DuplicateDevice(c)) if c == "jflte"
        );
    }

    #[test]
    fn reset_keeps_patch_infos() {
        let mut registry = Registry::new(Directories::new("/data"));
        registry.add_patch_info(patch_info("jflte/a", &[])).unwrap();
        registry.directories_mut().overrides_mut().inits = Some("/opt/inits".into());

        registry.reset();

        assert!(registry.devices().is_empty());
        assert_eq!(registry.directories().inits(), Path::new("inits"));
        assert_eq!(registry.patch_infos().len(), 1);
    }

    #[test]
    fn applicable_patch_infos() {
        let mut registry = Registry::new(Directories::new("/data"));
        for id in ["Other/x", "jflte/a", "klte/b", "Google_Apps/g", "jflte/c"] {
            registry.add_patch_info(patch_info(id, &[])).unwrap();
        }

        let jflte = registry.device("jflte").unwrap();
        let ids = registry
            .patch_infos_for_device(jflte)
            .into_iter()
            .map(|i| i.id())
            .collect::<Vec<_>>();

        assert_eq!(ids, ["Other/x", "jflte/a", "Google_Apps/g", "jflte/c"]);
    }

    #[test]
    fn matching_requires_device_and_name() {
        let mut registry = Registry::new(Directories::new("/data"));
        registry
            .add_patch_info(patch_info("jflte/a", &[".*"]))
            .unwrap();

        assert!(registry.find_matching_patch_info("mako", "rom.zip").is_none());
        assert!(registry.find_matching_patch_info("jflte", "").is_none());
        assert_eq!(
            registry
                .find_matching_patch_info("jflte", "/sdcard/rom.zip")
                .map(|i| i.id()),
            Some("jflte/a"),
        );
    }

    #[test]
    fn duplicate_patch_info() {
        let mut registry = Registry::new(Directories::new("/data"));
        registry.add_patch_info(patch_info("jflte/a", &[])).unwrap();

        assert_matches!(
            registry.add_patch_info(patch_info("jflte/a", &[])),
            Err(Error::Loader(loader::Error::DuplicatePatchInfo(id))) if id == "jflte/a"
        );
    }

    #[test]
    fn init_binaries_sorted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inits = temp_dir.path().join("inits");
        fs::create_dir_all(inits.join("jflte")).unwrap();
        fs::write(inits.join("jflte/tw44-init"), "").unwrap();
        fs::write(inits.join("init-kk44"), "").unwrap();

        let registry = Registry::new(Directories::new(temp_dir.path()));
        assert_eq!(registry.init_binaries(), ["init-kk44", "jflte/tw44-init"]);

        let registry = Registry::new(Directories::new(temp_dir.path().join("missing")));
        assert!(registry.init_binaries().is_empty());
    }

    #[test]
    fn plugin_identifiers() {
        let registry = Registry::new(Directories::new("/data"));

        assert_eq!(registry.patchers().len(), 3);
        assert_eq!(registry.auto_patchers().len(), 11);
        assert_eq!(registry.ramdisk_patchers().len(), 12);
        assert_eq!(registry.patcher_name("PrimaryUpgradePatcher"), "Primary ROM Upgrade");
        assert_eq!(registry.patcher_name("Bogus"), "");
        assert!(registry.create_patcher("Bogus").is_none());
        assert_eq!(
            registry.create_patcher("MultiBootPatcher").unwrap().partition_configs().len(),
            4,
        );
    }
}
