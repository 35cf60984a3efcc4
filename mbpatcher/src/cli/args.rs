/*
 * SPDX-FileCopyrightText: 2026 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{Level, debug};

use crate::{
    cli::{completion, matching, query},
    config::{self, Config, DirectoryOverrides},
    registry::Registry,
};

/// Data directory used when neither the config file nor the command line
/// specify one.
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Level and message only.
    #[default]
    Short,
    /// Also include the timestamp and target.
    Medium,
    /// Also include the source location.
    Long,
}

pub fn init_logging(log_level: LogLevel, log_format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::from(log_level));

    match log_format {
        LogFormat::Short => builder.without_time().with_target(false).init(),
        LogFormat::Medium => builder.init(),
        LogFormat::Long => builder.with_file(true).with_line_number(true).init(),
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Devices(query::DevicesCli),
    Patchinfos(query::PatchInfosCli),
    Show(query::ShowCli),
    Match(matching::MatchCli),
    Partconfigs(query::PartConfigsCli),
    Plugins(query::PluginsCli),
    Inits(query::InitsCli),
    Completion(completion::CompletionCli),
}

/// Options for locating the data files.
#[derive(Debug, Args)]
pub struct DirectoryGroup {
    /// Path to TOML config file.
    #[arg(long, global = true, value_name = "FILE", value_parser)]
    pub config: Option<PathBuf>,

    /// Base directory for all data files.
    #[arg(long, global = true, value_name = "DIR", value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Directory containing helper binaries.
    #[arg(long, global = true, value_name = "DIR", value_parser)]
    pub binaries_dir: Option<PathBuf>,

    /// Directory containing patched init binaries.
    #[arg(long, global = true, value_name = "DIR", value_parser)]
    pub inits_dir: Option<PathBuf>,

    /// Directory containing diffs used by auto-patchers.
    #[arg(long, global = true, value_name = "DIR", value_parser)]
    pub patches_dir: Option<PathBuf>,

    /// Directory containing patchinfo description files.
    #[arg(long, global = true, value_name = "DIR", value_parser)]
    pub patchinfos_dir: Option<PathBuf>,

    /// Directory containing installer scripts.
    #[arg(long, global = true, value_name = "DIR", value_parser)]
    pub scripts_dir: Option<PathBuf>,
}

impl DirectoryGroup {
    fn overrides(&self) -> DirectoryOverrides {
        DirectoryOverrides {
            binaries: self.binaries_dir.clone(),
            inits: self.inits_dir.clone(),
            patches: self.patches_dir.clone(),
            patchinfos: self.patchinfos_dir.clone(),
            scripts: self.scripts_dir.clone(),
        }
    }

    /// Build a registry from the config file and command-line overrides. No
    /// patchinfos are loaded.
    pub fn registry(&self) -> Result<Registry> {
        let config = match &self.config {
            Some(path) => config::load_config(path)
                .with_context(|| format!("Failed to load config: {path:?}"))?,
            None => Config::default(),
        };

        let mut registry = Registry::from_config(&config, Path::new(DEFAULT_DATA_DIR))
            .context("Failed to register devices from config")?;

        let directories = registry.directories_mut();
        if let Some(data_dir) = &self.data_dir {
            directories.set_data_dir(data_dir);
        }
        directories.merge_overrides(&self.overrides());

        debug!("Using directories: {:?}", registry.directories());

        Ok(registry)
    }

    /// Like [`Self::registry`], but also load the patchinfos.
    pub fn loaded_registry(&self) -> Result<Registry> {
        let mut registry = self.registry()?;

        registry.load_patch_infos().with_context(|| {
            format!(
                "Failed to load patchinfos: {:?}",
                registry.directories().patchinfos(),
            )
        })?;

        Ok(registry)
    }
}

#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub directories: DirectoryGroup,

    /// Lowest log message severity to output.
    #[arg(long, global = true, value_name = "LEVEL", default_value_t, value_enum)]
    pub log_level: LogLevel,

    /// Output format for log messages.
    #[arg(long, global = true, value_name = "FORMAT", default_value_t, value_enum)]
    pub log_format: LogFormat,
}

pub fn main(logging_initialized: &AtomicBool) -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_level, cli.log_format);
    logging_initialized.store(true, Ordering::SeqCst);

    match cli.command {
        Command::Devices(c) => query::devices_main(&c, &cli.directories),
        Command::Patchinfos(c) => query::patch_infos_main(&c, &cli.directories),
        Command::Show(c) => query::show_main(&c, &cli.directories),
        Command::Match(c) => matching::match_main(&c, &cli.directories),
        Command::Partconfigs(c) => query::partconfigs_main(&c, &cli.directories),
        Command::Plugins(c) => query::plugins_main(&c, &cli.directories),
        Command::Inits(c) => query::inits_main(&c, &cli.directories),
        Command::Completion(c) => completion::completion_main(&c),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn command_line_overrides_config() {
        let cli = Cli::try_parse_from([
            "mbpatcher",
            "--data-dir",
            "/data",
            "--inits-dir",
            "/opt/inits",
            "devices",
        ])
        .unwrap();

        let registry = cli.directories.registry().unwrap();
        let directories = registry.directories();

        assert_eq!(directories.inits(), Path::new("/opt/inits"));
        assert_eq!(directories.patchinfos(), Path::new("/data/patchinfos"));
    }
}
