// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use crate::{device::PartitionRole, partconfig::PartitionConfig, patcher::Patcher};

/// Number of multi-boot slots offered by [`MultiBootPatcher`].
const MULTI_SLOTS: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatcherKind {
    MultiBoot,
    PrimaryUpgrade,
    SyncdaemonUpdate,
}

impl PatcherKind {
    pub const ALL: [Self; 3] = [Self::MultiBoot, Self::PrimaryUpgrade, Self::SyncdaemonUpdate];

    pub fn id(self) -> &'static str {
        match self {
            Self::MultiBoot => "MultiBootPatcher",
            Self::PrimaryUpgrade => "PrimaryUpgradePatcher",
            Self::SyncdaemonUpdate => "SyncdaemonUpdatePatcher",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MultiBoot => "Multi Boot Patcher",
            Self::PrimaryUpgrade => "Primary ROM Upgrade",
            Self::SyncdaemonUpdate => "Syncdaemon Update",
        }
    }
}

impl fmt::Display for PatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn dual_config() -> PartitionConfig {
    PartitionConfig {
        id: "dual".to_owned(),
        name: "Dual Boot".to_owned(),
        description: "Secondary ROM in /system/dual, /cache/dual, /data/dual".to_owned(),
        kernel: "secondary".to_owned(),
        target_system: "/raw-system/dual".to_owned(),
        target_cache: "/raw-cache/dual".to_owned(),
        target_data: "/raw-data/dual".to_owned(),
        target_system_partition: PartitionRole::System,
        target_cache_partition: PartitionRole::Cache,
        target_data_partition: PartitionRole::Data,
    }
}

fn multi_slot_config(slot: u8) -> PartitionConfig {
    PartitionConfig {
        id: format!("multi-slot-{slot}"),
        name: format!("Multi Boot Slot {slot}"),
        description: format!(
            "ROM in /cache/multi-slot-{slot}/system, /system/multi-slot-{slot}/cache, \
             /data/multi-slot-{slot}",
        ),
        kernel: format!("multi-slot-{slot}"),
        target_system: format!("/raw-cache/multi-slot-{slot}/system"),
        target_cache: format!("/raw-system/multi-slot-{slot}/cache"),
        target_data: format!("/raw-data/multi-slot-{slot}"),
        target_system_partition: PartitionRole::Cache,
        target_cache_partition: PartitionRole::System,
        target_data_partition: PartitionRole::Data,
    }
}

fn primary_upgrade_config() -> PartitionConfig {
    PartitionConfig {
        id: "primaryupgrade".to_owned(),
        name: "Primary ROM Upgrade".to_owned(),
        description: "Upgrade the primary ROM without wiping other ROMs".to_owned(),
        kernel: "primary".to_owned(),
        target_system: "/raw-system".to_owned(),
        target_cache: "/raw-cache".to_owned(),
        target_data: "/raw-data".to_owned(),
        target_system_partition: PartitionRole::System,
        target_cache_partition: PartitionRole::Cache,
        target_data_partition: PartitionRole::Data,
    }
}

/// Partition configurations provided by a primary patcher.
pub fn partition_configs(kind: PatcherKind) -> Vec<PartitionConfig> {
    match kind {
        PatcherKind::MultiBoot => std::iter::once(dual_config())
            .chain((1..=MULTI_SLOTS).map(multi_slot_config))
            .collect(),
        PatcherKind::PrimaryUpgrade => vec![primary_upgrade_config()],
        PatcherKind::SyncdaemonUpdate => vec![],
    }
}

/// Patch a ROM so that it installs into one of the secondary slots.
pub struct MultiBootPatcher;

impl Patcher for MultiBootPatcher {
    fn kind(&self) -> PatcherKind {
        PatcherKind::MultiBoot
    }
}

/// Patch a ROM so that upgrading the primary ROM leaves other ROMs intact.
pub struct PrimaryUpgradePatcher;

impl Patcher for PrimaryUpgradePatcher {
    fn kind(&self) -> PatcherKind {
        PatcherKind::PrimaryUpgrade
    }
}

/// Update the boot-time syncing daemon in an already patched ramdisk.
pub struct SyncdaemonUpdatePatcher;

impl Patcher for SyncdaemonUpdatePatcher {
    fn kind(&self) -> PatcherKind {
        PatcherKind::SyncdaemonUpdate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_boot_configs() {
        let ids = partition_configs(PatcherKind::MultiBoot)
            .into_iter()
            .map(|c| c.id)
            .collect::<Vec<_>>();

        assert_eq!(ids, ["dual", "multi-slot-1", "multi-slot-2", "multi-slot-3"]);
        assert!(partition_configs(PatcherKind::SyncdaemonUpdate).is_empty());
    }
}
