// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, fs};

use regex::Regex;
use tracing::trace;

use crate::{
    patcher::{AutoPatcher, Error, FileInfo, Result},
    patchinfo::AutoPatcherArgs,
    registry::Registry,
};

const UPDATER_SCRIPT: &str = "META-INF/com/google/android/updater-script";
const AROMA_CONFIG: &str = "META-INF/com/google/android/aroma-config";
const BUILD_PROP: &str = "system/build.prop";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AutoPatcherKind {
    DalvikCache,
    GoogleEdition,
    SlimAromaBundledMount,
    Imperium,
    NegaliteNoWipeData,
    TriForceFixAroma,
    TriForceFixUpdate,
    NoobdevMultiBoot,
    NoobdevSystemProp,
    PatchFile,
    Standard,
}

impl AutoPatcherKind {
    pub const ALL: [Self; 11] = [
        Self::DalvikCache,
        Self::GoogleEdition,
        Self::SlimAromaBundledMount,
        Self::Imperium,
        Self::NegaliteNoWipeData,
        Self::TriForceFixAroma,
        Self::TriForceFixUpdate,
        Self::NoobdevMultiBoot,
        Self::NoobdevSystemProp,
        Self::PatchFile,
        Self::Standard,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::DalvikCache => "DalvikCachePatcher",
            Self::GoogleEdition => "GoogleEditionPatcher",
            Self::SlimAromaBundledMount => "SlimAromaBundledMount",
            Self::Imperium => "ImperiumPatcher",
            Self::NegaliteNoWipeData => "NegaliteNoWipeData",
            Self::TriForceFixAroma => "TriForceFixAroma",
            Self::TriForceFixUpdate => "TriForceFixUpdate",
            Self::NoobdevMultiBoot => "NoobdevMultiBoot",
            Self::NoobdevSystemProp => "NoobdevSystemProp",
            Self::PatchFile => "PatchFile",
            Self::Standard => "StandardPatcher",
        }
    }

    /// Files edited by auto-patchers that always touch the same paths.
    fn fixed_files(self) -> &'static [&'static str] {
        match self {
            Self::TriForceFixAroma => &[AROMA_CONFIG],
            Self::NoobdevSystemProp => &[BUILD_PROP],
            Self::PatchFile => &[],
            Self::DalvikCache
            | Self::GoogleEdition
            | Self::SlimAromaBundledMount
            | Self::Imperium
            | Self::NegaliteNoWipeData
            | Self::TriForceFixUpdate
            | Self::NoobdevMultiBoot
            | Self::Standard => &[UPDATER_SCRIPT],
        }
    }
}

impl fmt::Display for AutoPatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Auto-patcher that edits a fixed set of installer files.
pub struct ScriptPatcher<'a> {
    kind: AutoPatcherKind,
    info: &'a FileInfo,
    args: AutoPatcherArgs,
}

impl<'a> ScriptPatcher<'a> {
    pub fn new(kind: AutoPatcherKind, info: &'a FileInfo, args: AutoPatcherArgs) -> Self {
        Self { kind, info, args }
    }
}

impl AutoPatcher for ScriptPatcher<'_> {
    fn kind(&self) -> AutoPatcherKind {
        self.kind
    }

    fn args(&self) -> &AutoPatcherArgs {
        &self.args
    }

    fn existing_files(&self) -> Result<Vec<String>> {
        trace!("{} files for {:?}", self.kind, self.info.path);

        Ok(self
            .kind
            .fixed_files()
            .iter()
            .map(|f| (*f).to_owned())
            .collect())
    }
}

/// Auto-patcher that applies a unified diff from the patches directory. The
/// diff is named by the `file` argument.
pub struct PatchFilePatcher<'a> {
    registry: &'a Registry,
    info: &'a FileInfo,
    args: AutoPatcherArgs,
}

impl<'a> PatchFilePatcher<'a> {
    pub const ARG_FILE: &'static str = "file";
    const HEADER_REGEX: &'static str = r"(?m)^\+\+\+ (?:b/)?([^\t\r\n]+)";

    pub fn new(registry: &'a Registry, info: &'a FileInfo, args: AutoPatcherArgs) -> Self {
        Self {
            registry,
            info,
            args,
        }
    }
}

impl AutoPatcher for PatchFilePatcher<'_> {
    fn kind(&self) -> AutoPatcherKind {
        AutoPatcherKind::PatchFile
    }

    fn args(&self) -> &AutoPatcherArgs {
        &self.args
    }

    /// Files named by the `+++` headers of the diff.
    fn existing_files(&self) -> Result<Vec<String>> {
        let name = self
            .args
            .get(Self::ARG_FILE)
            .ok_or(Error::MissingArgument {
                kind: AutoPatcherKind::PatchFile.id(),
                arg: Self::ARG_FILE,
            })?;
        let path = self.registry.directories().patches().join(name);
        let diff = fs::read_to_string(&path).map_err(|e| Error::File(path.clone(), e))?;

        let header = Regex::new(Self::HEADER_REGEX).unwrap();
        let files = header
            .captures_iter(&diff)
            .map(|c| c[1].to_owned())
            .collect::<Vec<_>>();

        trace!(
            "Files modified by {path:?} for {:?}: {files:?}",
            self.info.path,
        );

        Ok(files)
    }
}
