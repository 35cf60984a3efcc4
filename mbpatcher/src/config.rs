/*
 * SPDX-FileCopyrightText: 2026 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::device::{Device, PartitionRole, SelinuxMode};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config: {0:?}")]
    File(PathBuf, #[source] io::Error),
    #[error("Failed to parse config: {0:?}")]
    Parse(PathBuf, #[source] toml_edit::de::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Locations of the data files. Each directory defaults to a subdirectory of
/// the data directory unless explicitly overridden.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryOverrides {
    pub binaries: Option<PathBuf>,
    pub inits: Option<PathBuf>,
    pub patches: Option<PathBuf>,
    pub patchinfos: Option<PathBuf>,
    pub scripts: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directories {
    data_dir: PathBuf,
    overrides: DirectoryOverrides,
}

impl Directories {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            overrides: DirectoryOverrides::default(),
        }
    }

    fn resolve(&self, value: Option<&PathBuf>, name: &str) -> PathBuf {
        value.cloned().unwrap_or_else(|| self.data_dir.join(name))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn binaries(&self) -> PathBuf {
        self.resolve(self.overrides.binaries.as_ref(), "binaries")
    }

    pub fn inits(&self) -> PathBuf {
        self.resolve(self.overrides.inits.as_ref(), "inits")
    }

    pub fn patches(&self) -> PathBuf {
        self.resolve(self.overrides.patches.as_ref(), "patches")
    }

    pub fn patchinfos(&self) -> PathBuf {
        self.resolve(self.overrides.patchinfos.as_ref(), "patchinfos")
    }

    pub fn scripts(&self) -> PathBuf {
        self.resolve(self.overrides.scripts.as_ref(), "scripts")
    }

    pub fn set_data_dir(&mut self, path: impl Into<PathBuf>) {
        self.data_dir = path.into();
    }

    pub fn overrides(&self) -> &DirectoryOverrides {
        &self.overrides
    }

    pub fn overrides_mut(&mut self) -> &mut DirectoryOverrides {
        &mut self.overrides
    }

    /// Apply every override that is set in `other`.
    pub fn merge_overrides(&mut self, other: &DirectoryOverrides) {
        let fields = [
            (&mut self.overrides.binaries, &other.binaries),
            (&mut self.overrides.inits, &other.inits),
            (&mut self.overrides.patches, &other.patches),
            (&mut self.overrides.patchinfos, &other.patchinfos),
            (&mut self.overrides.scripts, &other.scripts),
        ];

        for (dest, src) in fields {
            if let Some(path) = src {
                *dest = Some(path.clone());
            }
        }
    }

    /// Revert every directory to its default under the data directory.
    pub fn clear_overrides(&mut self) {
        self.overrides = DirectoryOverrides::default();
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default)]
    pub selinux: SelinuxMode,
    #[serde(default)]
    pub partitions: BTreeMap<PartitionRole, String>,
}

impl DeviceConfig {
    pub fn to_device(&self, codename: &str) -> Device {
        self.partitions.iter().fold(
            Device::new(codename, &self.name, self.selinux),
            |device, (role, block_dev)| device.with_partition(*role, block_dev),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub directories: DirectoryOverrides,
    #[serde(default)]
    pub device: BTreeMap<String, DeviceConfig>,
}

impl Config {
    /// Directories described by this config. `default_data_dir` is used if
    /// the config does not set a data directory.
    pub fn directories(&self, default_data_dir: &Path) -> Directories {
        let data_dir = self.data_dir.as_deref().unwrap_or(default_data_dir);
        let mut directories = Directories::new(data_dir);
        directories.merge_overrides(&self.directories);
        directories
    }

    /// Extra devices defined by this config, sorted by codename.
    pub fn devices(&self) -> Vec<Device> {
        self.device
            .iter()
            .map(|(codename, d)| d.to_device(codename))
            .collect()
    }
}

pub fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    toml_edit::de::from_str(contents).map_err(|e| Error::Parse(path.to_owned(), e))
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).map_err(|e| Error::File(path.to_owned(), e))?;

    parse_config(path, &contents)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_directories() {
        let mut directories = Directories::new("/data");

        assert_eq!(directories.inits(), Path::new("/data/inits"));
        assert_eq!(directories.patchinfos(), Path::new("/data/patchinfos"));

        directories.overrides_mut().inits = Some("/opt/inits".into());
        assert_eq!(directories.inits(), Path::new("/opt/inits"));
        assert_eq!(directories.binaries(), Path::new("/data/binaries"));

        // Defaults follow the data directory.
        directories.set_data_dir("/other");
        assert_eq!(directories.scripts(), Path::new("/other/scripts"));

        directories.clear_overrides();
        assert_eq!(directories.inits(), Path::new("/other/inits"));
    }

    #[test]
    fn parse_full_config() {
        let config = parse_config(
            Path::new("test.toml"),
            r#"
                data_dir = "/usr/share/mbpatcher"

                [directories]
                inits = "/opt/inits"

                [device.mako]
                name = "Google/LG Nexus 4"
                selinux = "permissive"
                partitions = { system = "mmcblk0p21" }
            "#,
        )
        .unwrap();

        let directories = config.directories(Path::new("/ignored"));
        assert_eq!(directories.data_dir(), Path::new("/usr/share/mbpatcher"));
        assert_eq!(directories.inits(), Path::new("/opt/inits"));
        assert_eq!(
            directories.patches(),
            Path::new("/usr/share/mbpatcher/patches"),
        );

        let devices = config.devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].codename(), "mako");
        assert_eq!(devices[0].selinux(), SelinuxMode::Permissive);
        assert_eq!(
            devices[0].partition(PartitionRole::System),
            Some("mmcblk0p21"),
        );
        assert_eq!(devices[0].partition(PartitionRole::Data), None);
    }

    #[test]
    fn empty_config() {
        let config = parse_config(Path::new("test.toml"), "").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(
            config.directories(Path::new("/data")),
            Directories::new("/data"),
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert_matches!(
            parse_config(Path::new("test.toml"), "[directories]\nfoo = \"/bar\"\n"),
            Err(Error::Parse(_, _))
        );
        assert_matches!(
            load_config(Path::new("/nonexistent/config.toml")),
            Err(Error::File(_, _))
        );
    }
}
