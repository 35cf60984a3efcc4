// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, fs};

use phf::phf_map;
use tracing::{debug, trace};

use crate::{
    patcher::{Error, FileInfo, RamdiskArchive, RamdiskPatcher, Result},
    registry::Registry,
};

const INIT: &str = "init";
const INIT_ORIG: &str = "init.orig";

/// fstab that every ramdisk for the device is expected to contain.
static DEVICE_FSTABS: phf::Map<&'static str, &'static str> = phf_map! {
    "bacon" => "fstab.bacon",
    "d800" => "fstab.g2",
    "falcon" => "fstab.qcom",
    "hammerhead" => "fstab.hammerhead",
    "hlte" => "fstab.qcom",
    "jflte" => "fstab.qcom",
    "klte" => "fstab.qcom",
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RamdiskPatcherKind {
    BaconDefault,
    D800Default,
    FalconDefault,
    HammerheadAosp,
    HammerheadNoobdev,
    HlteAosp,
    JflteAosp,
    JflteGoogleEdition,
    JflteNoobdev,
    JflteTouchWiz,
    KlteAosp,
    KlteTouchWiz,
}

impl RamdiskPatcherKind {
    pub const ALL: [Self; 12] = [
        Self::BaconDefault,
        Self::D800Default,
        Self::FalconDefault,
        Self::HammerheadAosp,
        Self::HammerheadNoobdev,
        Self::HlteAosp,
        Self::JflteAosp,
        Self::JflteGoogleEdition,
        Self::JflteNoobdev,
        Self::JflteTouchWiz,
        Self::KlteAosp,
        Self::KlteTouchWiz,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::BaconDefault => "bacon/default",
            Self::D800Default => "d800/default",
            Self::FalconDefault => "falcon/default",
            Self::HammerheadAosp => "hammerhead/AOSP",
            Self::HammerheadNoobdev => "hammerhead/noobdev",
            Self::HlteAosp => "hlte/AOSP",
            Self::JflteAosp => "jflte/AOSP",
            Self::JflteGoogleEdition => "jflte/GoogleEdition",
            Self::JflteNoobdev => "jflte/noobdev",
            Self::JflteTouchWiz => "jflte/TouchWiz",
            Self::KlteAosp => "klte/AOSP",
            Self::KlteTouchWiz => "klte/TouchWiz",
        }
    }

    /// Codename of the device whose ramdisks this patcher understands.
    pub fn device(self) -> &'static str {
        self.id().split_once('/').map_or(self.id(), |(d, _)| d)
    }

    fn fstab(self) -> Option<&'static str> {
        DEVICE_FSTABS.get(self.device()).copied()
    }
}

impl fmt::Display for RamdiskPatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Ramdisk patcher for a single device and ROM flavor.
pub struct DeviceRamdiskPatcher<'a> {
    kind: RamdiskPatcherKind,
    registry: &'a Registry,
    info: &'a FileInfo,
    archive: &'a mut dyn RamdiskArchive,
}

impl<'a> DeviceRamdiskPatcher<'a> {
    pub fn new(
        kind: RamdiskPatcherKind,
        registry: &'a Registry,
        info: &'a FileInfo,
        archive: &'a mut dyn RamdiskArchive,
    ) -> Self {
        Self {
            kind,
            registry,
            info,
            archive,
        }
    }

    fn check_fstab(&self) -> Result<()> {
        if let Some(fstab) = self.kind.fstab()
            && !self.archive.exists(fstab)
        {
            return Err(Error::MissingRamdiskFile(fstab.to_owned()));
        }

        Ok(())
    }

    /// Replace `init` with the patched init binary named by the patchinfo.
    /// The original is kept as `init.orig`. Does nothing if the patchinfo
    /// does not specify a patched init.
    fn install_patched_init(&mut self) -> Result<()> {
        let patch_info = self
            .registry
            .patch_info(&self.info.patch_info)
            .ok_or_else(|| Error::UnknownPatchInfo(self.info.patch_info.clone()))?;

        let Some(init) = patch_info.resolve_patched_init(&self.info.rule_type) else {
            trace!("No patched init for {:?}", self.info.patch_info);
            return Ok(());
        };

        let path = self.registry.directories().inits().join(init);
        let data = fs::read(&path).map_err(|e| Error::File(path.clone(), e))?;

        // An already patched ramdisk keeps its original init.
        if !self.archive.exists(INIT_ORIG) && !self.archive.rename(INIT, INIT_ORIG) {
            return Err(Error::MissingRamdiskFile(INIT.to_owned()));
        }

        debug!("Installing patched init: {path:?}");
        self.archive.set_contents(INIT, data);

        Ok(())
    }
}

impl RamdiskPatcher for DeviceRamdiskPatcher<'_> {
    fn kind(&self) -> RamdiskPatcherKind {
        self.kind
    }

    fn patch_ramdisk(&mut self) -> Result<()> {
        if self.registry.device(&self.info.device).is_none() {
            return Err(Error::UnknownDevice(self.info.device.clone()));
        }

        self.check_fstab()?;
        self.install_patched_init()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        config::Directories,
        patchinfo::{PatchInfo, RuleType},
    };

    fn setup(patched_init: Option<&str>) -> (tempfile::TempDir, Registry) {
        let temp_dir = tempfile::tempdir().unwrap();
        let inits = temp_dir.path().join("inits");
        fs::create_dir_all(&inits).unwrap();
        fs::write(inits.join("init-kk44"), b"patched").unwrap();

        let mut patch_info = PatchInfo::new();
        patch_info.set_id("jflte/AOSP/cm");
        patch_info.add_regex("^cm-.*\\.zip$");
        if let Some(init) = patched_init {
            patch_info.bundle_mut(&RuleType::Default).patched_init = Some(init.to_owned());
        }

        let mut registry = Registry::new(Directories::new(temp_dir.path()));
        registry.add_patch_info(patch_info).unwrap();

        (temp_dir, registry)
    }

    fn file_info(device: &str) -> FileInfo {
        FileInfo {
            path: "cm-11.zip".into(),
            device: device.to_owned(),
            patch_info: "jflte/AOSP/cm".to_owned(),
            rule_type: RuleType::Default,
            partconfig: "dual".to_owned(),
        }
    }

    fn ramdisk() -> BTreeMap<String, Vec<u8>> {
        BTreeMap::from([
            ("init".to_owned(), b"stock".to_vec()),
            ("fstab.qcom".to_owned(), vec![]),
        ])
    }

    #[test]
    fn kind_device() {
        assert_eq!(RamdiskPatcherKind::JflteTouchWiz.device(), "jflte");
        assert_eq!(RamdiskPatcherKind::D800Default.fstab(), Some("fstab.g2"));
    }

    #[test]
    fn installs_patched_init() {
        let (_temp_dir, registry) = setup(Some("init-kk44"));
        let info = file_info("jflte");
        let mut archive = ramdisk();

        DeviceRamdiskPatcher::new(RamdiskPatcherKind::JflteAosp, &registry, &info, &mut archive)
            .patch_ramdisk()
            .unwrap();

        assert_eq!(archive["init"], b"patched");
        assert_eq!(archive["init.orig"], b"stock");

        // Patching again must not clobber the saved original.
        DeviceRamdiskPatcher::new(RamdiskPatcherKind::JflteAosp, &registry, &info, &mut archive)
            .patch_ramdisk()
            .unwrap();

        assert_eq!(archive["init.orig"], b"stock");
    }

    #[test]
    fn no_patched_init() {
        let (_temp_dir, registry) = setup(None);
        let info = file_info("jflte");
        let mut archive = ramdisk();

        DeviceRamdiskPatcher::new(RamdiskPatcherKind::JflteAosp, &registry, &info, &mut archive)
            .patch_ramdisk()
            .unwrap();

        assert_eq!(archive["init"], b"stock");
        assert!(!archive.contains_key("init.orig"));
    }

    #[test]
    fn wrong_device_ramdisk() {
        let (_temp_dir, registry) = setup(Some("init-kk44"));
        let info = file_info("hammerhead");
        let mut archive = ramdisk();

        assert_matches!(
            DeviceRamdiskPatcher::new(
                RamdiskPatcherKind::HammerheadAosp,
                &registry,
                &info,
                &mut archive,
            )
            .patch_ramdisk(),
            Err(Error::MissingRamdiskFile(f)) if f == "fstab.hammerhead"
        );

        let info = file_info("nonexistent");
        assert_matches!(
            DeviceRamdiskPatcher::new(RamdiskPatcherKind::JflteAosp, &registry, &info, &mut archive)
                .patch_ramdisk(),
            Err(Error::UnknownDevice(_))
        );
    }
}
