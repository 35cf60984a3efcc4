// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use anyhow::{Context, Result};
use clap::Parser;

use crate::{cli::args::DirectoryGroup, patchinfo::PatchInfo, registry::Registry};

fn print_sections<T: ToString>(items: impl IntoIterator<Item = T>) {
    let sections = items.into_iter().map(|i| i.to_string()).collect::<Vec<_>>();

    println!("{}", sections.join("\n\n"));
}

pub fn devices_main(_cli: &DevicesCli, dirs: &DirectoryGroup) -> Result<()> {
    let registry = dirs.registry()?;

    print_sections(registry.devices());

    Ok(())
}

fn patch_infos_for<'a>(
    registry: &'a Registry,
    device: Option<&str>,
) -> Result<Vec<&'a PatchInfo>> {
    match device {
        Some(codename) => {
            let device = registry
                .device(codename)
                .with_context(|| format!("Unknown device: {codename:?}"))?;

            Ok(registry.patch_infos_for_device(device))
        }
        None => Ok(registry.patch_infos().iter().collect()),
    }
}

pub fn patch_infos_main(cli: &PatchInfosCli, dirs: &DirectoryGroup) -> Result<()> {
    let registry = dirs.loaded_registry()?;

    for info in patch_infos_for(&registry, cli.device.as_deref())? {
        match info.name() {
            Some(name) => println!("{}: {name}", info.id()),
            None => println!("{}", info.id()),
        }
    }

    Ok(())
}

pub fn show_main(cli: &ShowCli, dirs: &DirectoryGroup) -> Result<()> {
    let registry = dirs.loaded_registry()?;
    let info = registry
        .patch_info(&cli.id)
        .with_context(|| format!("Patchinfo not found: {:?}", cli.id))?;

    println!("{info}");

    Ok(())
}

pub fn partconfigs_main(_cli: &PartConfigsCli, dirs: &DirectoryGroup) -> Result<()> {
    let registry = dirs.registry()?;

    print_sections(registry.partition_configs());

    Ok(())
}

pub fn plugins_main(_cli: &PluginsCli, dirs: &DirectoryGroup) -> Result<()> {
    let registry = dirs.registry()?;

    println!("Patchers:");
    for id in registry.patchers() {
        println!("- {id} ({})", registry.patcher_name(id));
    }

    println!("Auto-patchers:");
    for id in registry.auto_patchers() {
        println!("- {id}");
    }

    println!("Ramdisk patchers:");
    for id in registry.ramdisk_patchers() {
        println!("- {id}");
    }

    Ok(())
}

pub fn inits_main(_cli: &InitsCli, dirs: &DirectoryGroup) -> Result<()> {
    let registry = dirs.registry()?;

    for init in registry.init_binaries() {
        println!("{init}");
    }

    Ok(())
}

/// List known devices.
#[derive(Debug, Parser)]
pub struct DevicesCli {}

/// List loaded patchinfos.
#[derive(Debug, Parser)]
pub struct PatchInfosCli {
    /// Only list patchinfos that apply to this device.
    #[arg(short, long, value_name = "CODENAME")]
    pub device: Option<String>,
}

/// Show every rule bundle of a patchinfo.
#[derive(Debug, Parser)]
pub struct ShowCli {
    /// Patchinfo ID (eg. `jflte/AOSP/cyanogenmod`).
    #[arg(value_name = "ID")]
    pub id: String,
}

/// List partition configurations provided by the patchers.
#[derive(Debug, Parser)]
pub struct PartConfigsCli {}

/// List patcher, auto-patcher and ramdisk patcher identifiers.
#[derive(Debug, Parser)]
pub struct PluginsCli {}

/// List available patched init binaries.
#[derive(Debug, Parser)]
pub struct InitsCli {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Directories;

    #[test]
    fn filter_by_device() {
        let mut registry = Registry::new(Directories::new("/data"));
        for id in ["jflte/a", "klte/b", "Other/c"] {
            let mut info = PatchInfo::new();
            info.set_id(id);
            registry.add_patch_info(info).unwrap();
        }

        let ids = |infos: Vec<&PatchInfo>| {
            infos
                .iter()
                .map(|i| i.id().to_owned())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            ids(patch_infos_for(&registry, Some("klte")).unwrap()),
            ["klte/b", "Other/c"],
        );
        assert_eq!(ids(patch_infos_for(&registry, None).unwrap()).len(), 3);
        assert!(patch_infos_for(&registry, Some("mako")).is_err());
    }
}
