// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt::Write, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::warn;

use crate::{
    cli::args::DirectoryGroup,
    patcher::{FileInfo, RamdiskPatcherKind},
    registry::Registry,
};

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("(none)")
}

/// Describe how `file_info` would be patched.
fn describe(registry: &Registry, file_info: &FileInfo) -> Result<String> {
    let info = registry
        .patch_info(&file_info.patch_info)
        .with_context(|| format!("Patchinfo not found: {:?}", file_info.patch_info))?;
    let rule_type = &file_info.rule_type;
    let mut out = String::new();

    writeln!(out, "Patchinfo {}:", info.id())?;
    writeln!(out, "- Name:           {}", or_none(info.name()))?;
    writeln!(out, "- Rule:           {rule_type}")?;
    writeln!(
        out,
        "- Has boot image: {}",
        info.resolve_has_boot_image(rule_type)
            .map_or("(unset)", yes_no),
    )?;

    let ramdisk = info.resolve_ramdisk(rule_type);
    writeln!(out, "- Ramdisk:        {}", or_none(ramdisk))?;
    if let Some(id) = ramdisk
        && id.parse::<RamdiskPatcherKind>().is_err()
    {
        warn!("Unknown ramdisk patcher: {id:?}");
    }

    writeln!(
        out,
        "- Patched init:   {}",
        or_none(info.resolve_patched_init(rule_type)),
    )?;
    writeln!(
        out,
        "- Device check:   {}",
        yes_no(info.resolve_device_check(rule_type)),
    )?;

    let supported = registry
        .partition_configs()
        .iter()
        .filter(|c| info.supports_partconfig(rule_type, &c.id))
        .map(|c| c.id.as_str())
        .collect::<Vec<_>>();
    writeln!(out, "- Partconfigs:    {}", supported.join(", "))?;

    out.push_str("- Auto-patchers:");
    let autopatchers = info.resolve_autopatchers(rule_type);
    if autopatchers.is_empty() {
        out.push_str("  (none)");
    }

    for (id, args) in autopatchers {
        write!(out, "\n  - {id}")?;

        for (key, value) in args {
            write!(out, " {key}={value:?}")?;
        }

        let Some(patcher) = registry.create_auto_patcher(id, file_info, args) else {
            warn!("Unknown auto-patcher: {id:?}");
            out.push_str(" (unknown)");
            continue;
        };

        match patcher.existing_files() {
            Ok(files) => {
                for file in files {
                    write!(out, "\n    - {file}")?;
                }
            }
            Err(e) => warn!("{id}: {e}"),
        }
    }

    Ok(out)
}

pub fn match_main(cli: &MatchCli, dirs: &DirectoryGroup) -> Result<()> {
    let registry = dirs.loaded_registry()?;

    if registry.device(&cli.device).is_none() {
        bail!("Unknown device: {:?}", cli.device);
    }

    let file_info = registry
        .file_info(&cli.file, &cli.device, &cli.partconfig)
        .with_context(|| format!("No patchinfo matches {:?} for {}", cli.file, cli.device))?;

    let info = registry
        .patch_info(&file_info.patch_info)
        .with_context(|| format!("Patchinfo not found: {:?}", file_info.patch_info))?;
    if !info.supports_partconfig(&file_info.rule_type, &cli.partconfig) {
        warn!(
            "{} does not support partition config {:?}",
            info.id(),
            cli.partconfig,
        );
    }

    println!("{}", describe(&registry, &file_info)?);

    Ok(())
}

/// Find the patchinfo that applies to a file.
#[derive(Debug, Parser)]
pub struct MatchCli {
    /// Codename of the target device.
    #[arg(short, long, value_name = "CODENAME")]
    pub device: String,

    /// Partition configuration to install to.
    #[arg(short, long, value_name = "ID", default_value = "dual")]
    pub partconfig: String,

    /// Path to ROM or other flashable zip.
    #[arg(value_name = "FILE", value_parser)]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Directories,
        patchinfo::{AutoPatcherArgs, PatchInfo, RuleType},
    };

    #[test]
    fn describe_resolved_bundle() {
        let mut info = PatchInfo::new();
        info.set_id("jflte/AOSP/cm");
        info.set_name("CyanogenMod");
        info.add_regex(r"^cm-.*\.zip$");
        info.add_regex(r"^nightly\.zip$");
        info.add_cond_regex(r"^nightly\.zip$");

        let default = info.bundle_mut(&RuleType::Default);
        default.has_boot_image = Some(true);
        default.ramdisk = Some("jflte/AOSP".to_owned());
        default.partconfigs = vec!["all".to_owned(), "!dual".to_owned()];
        default.autopatchers = vec![("StandardPatcher".to_owned(), AutoPatcherArgs::new())];

        let nightly = info.bundle_mut(&RuleType::Regex(r"^nightly\.zip$".to_owned()));
        nightly.device_check = Some(false);
        nightly.autopatchers = vec![("Bogus".to_owned(), AutoPatcherArgs::new())];

        let mut registry = Registry::new(Directories::new("/data"));
        registry.add_patch_info(info).unwrap();

        let file_info = registry
            .file_info("/sdcard/nightly.zip".as_ref(), "jflte", "multi-slot-1")
            .unwrap();
        assert_eq!(
            file_info.rule_type,
            RuleType::Regex(r"^nightly\.zip$".to_owned()),
        );

        let text = describe(&registry, &file_info).unwrap();
        assert!(text.contains("- Device check:   no"));
        assert!(text.contains("- Ramdisk:        jflte/AOSP"));
        assert!(text.contains("- Partconfigs:    multi-slot-1, multi-slot-2, multi-slot-3"));
        assert!(text.contains("Bogus (unknown)"));

        let file_info = registry
            .file_info("cm-11.zip".as_ref(), "jflte", "dual")
            .unwrap();
        assert_eq!(file_info.rule_type, RuleType::Default);

        let text = describe(&registry, &file_info).unwrap();
        assert!(text.contains("- Device check:   yes"));
        assert!(text.contains("META-INF/com/google/android/updater-script"));
    }
}
