// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{collections::BTreeMap, fmt};

use serde::Deserialize;

/// How the patched ramdisk should treat the device's SELinux policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SelinuxMode {
    /// Switch SELinux to permissive mode during boot.
    Permissive,
    /// Leave the policy as the ROM ships it.
    #[default]
    Unchanged,
}

impl fmt::Display for SelinuxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permissive => f.write_str("permissive"),
            Self::Unchanged => f.write_str("unchanged"),
        }
    }
}

/// Logical partition roles that can be mapped to a block device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    System,
    Cache,
    Data,
}

impl PartitionRole {
    pub const ALL: [Self; 3] = [Self::System, Self::Cache, Self::Data];
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Cache => f.write_str("cache"),
            Self::Data => f.write_str("data"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    codename: String,
    name: String,
    selinux: SelinuxMode,
    partitions: BTreeMap<PartitionRole, String>,
}

impl Device {
    pub fn new(codename: impl Into<String>, name: impl Into<String>, selinux: SelinuxMode) -> Self {
        Self {
            codename: codename.into(),
            name: name.into(),
            selinux,
            partitions: BTreeMap::new(),
        }
    }

    /// Builder-style helper for attaching a block device to a role.
    pub fn with_partition(mut self, role: PartitionRole, block_dev: impl Into<String>) -> Self {
        self.partitions.insert(role, block_dev.into());
        self
    }

    pub fn codename(&self) -> &str {
        &self.codename
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selinux(&self) -> SelinuxMode {
        self.selinux
    }

    /// Block device backing `role`. [`None`] means the device default is used.
    pub fn partition(&self, role: PartitionRole) -> Option<&str> {
        self.partitions.get(&role).map(|p| p.as_str())
    }

    pub fn partitions(&self) -> &BTreeMap<PartitionRole, String> {
        &self.partitions
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device {}:", self.codename)?;
        writeln!(f, "- Name:    {}", self.name)?;
        write!(f, "- SELinux: {}", self.selinux)?;

        for role in PartitionRole::ALL {
            let value = self.partition(role).unwrap_or("(default)");
            write!(f, "\n- {:<8} {value}", format!("{role}:"))?;
        }

        Ok(())
    }
}

/// Devices that are always available, regardless of configuration.
pub fn builtin_devices() -> Vec<Device> {
    use PartitionRole::{Cache, Data, System};

    vec![
        Device::new("jflte", "Samsung Galaxy S 4", SelinuxMode::Permissive)
            .with_partition(System, "mmcblk0p16")
            .with_partition(Cache, "mmcblk0p18")
            .with_partition(Data, "mmcblk0p29"),
        Device::new("klte", "Samsung Galaxy S 5", SelinuxMode::Permissive)
            .with_partition(System, "mmcblk0p23")
            .with_partition(Cache, "mmcblk0p24")
            .with_partition(Data, "mmcblk0p26"),
        Device::new("hlte", "Samsung Galaxy Note 3", SelinuxMode::Permissive)
            .with_partition(System, "mmcblk0p23")
            .with_partition(Cache, "mmcblk0p24")
            .with_partition(Data, "mmcblk0p26"),
        Device::new("hammerhead", "Google/LG Nexus 5", SelinuxMode::Unchanged),
        Device::new("bacon", "OnePlus One", SelinuxMode::Unchanged),
        Device::new("d800", "LG G2", SelinuxMode::Unchanged),
        Device::new("falcon", "Motorola Moto G", SelinuxMode::Unchanged),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn builtin_codenames_are_unique() {
        let devices = builtin_devices();
        let codenames = devices.iter().map(|d| d.codename()).collect::<HashSet<_>>();

        assert_eq!(codenames.len(), devices.len());
    }

    #[test]
    fn unmapped_partition_uses_default() {
        let devices = builtin_devices();
        let hammerhead = devices.iter().find(|d| d.codename() == "hammerhead").unwrap();
        let jflte = devices.iter().find(|d| d.codename() == "jflte").unwrap();

        assert_eq!(hammerhead.partition(PartitionRole::System), None);
        assert_eq!(jflte.partition(PartitionRole::Data), Some("mmcblk0p29"));
        assert_eq!(jflte.selinux(), SelinuxMode::Permissive);
    }
}
