// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! In-memory model of a patchinfo description file.
//!
//! A [`PatchInfo`] holds several [`RuleBundle`]s, one per [`RuleType`]. The
//! bundles are independent of each other. Code that needs an unconditional
//! answer uses the `resolve_*` functions, which fall back to the
//! [`RuleType::Default`] bundle explicitly.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use regex::Regex;
use tracing::warn;

use crate::{partconfig, util};

/// Arguments passed to an auto-patcher. Keys are unique and their order is
/// irrelevant.
pub type AutoPatcherArgs = BTreeMap<String, String>;

/// Identifies which rule bundle within a [`PatchInfo`] a directive belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    /// Top-level directives.
    Default,
    /// Directives used when none of the conditional regexes match.
    NotMatched,
    /// Directives used when the contained regex matches the file name.
    Regex(String),
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::NotMatched => f.write_str("not-matched"),
            Self::Regex(r) => write!(f, "matches {r:?}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleBundle {
    pub has_boot_image: Option<bool>,
    pub ramdisk: Option<String>,
    pub patched_init: Option<String>,
    pub autopatchers: Vec<(String, AutoPatcherArgs)>,
    pub device_check: Option<bool>,
    /// Signed partition configuration tokens. See [`partconfig`].
    pub partconfigs: Vec<String>,
}

/// Search for `pattern` anywhere in `haystack`. Patterns that fail to compile
/// never match.
pub(crate) fn regex_search(pattern: &str, haystack: &str) -> bool {
    match Regex::new(pattern) {
        Ok(r) => r.is_match(haystack),
        Err(e) => {
            warn!("Ignoring invalid regex {pattern:?}: {e}");
            false
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchInfo {
    id: String,
    name: Option<String>,
    regexes: Vec<String>,
    exclude_regexes: Vec<String>,
    cond_regexes: Vec<String>,
    has_not_matched: bool,
    bundles: HashMap<RuleType, RuleBundle>,
}

impl PatchInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the description file relative to the patchinfo directory, with
    /// the extension removed.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Regexes that make this patchinfo eligible for a file name.
    pub fn regexes(&self) -> &[String] {
        &self.regexes
    }

    pub fn add_regex(&mut self, regex: impl Into<String>) {
        self.regexes.push(regex.into());
    }

    /// Regexes that veto a selection regex match.
    pub fn exclude_regexes(&self) -> &[String] {
        &self.exclude_regexes
    }

    pub fn add_exclude_regex(&mut self, regex: impl Into<String>) {
        self.exclude_regexes.push(regex.into());
    }

    /// Regexes that introduced a [`RuleType::Regex`] bundle, in declaration
    /// order.
    pub fn cond_regexes(&self) -> &[String] {
        &self.cond_regexes
    }

    pub fn add_cond_regex(&mut self, regex: impl Into<String>) {
        self.cond_regexes.push(regex.into());
    }

    pub fn has_not_matched(&self) -> bool {
        self.has_not_matched
    }

    pub fn set_has_not_matched(&mut self, value: bool) {
        self.has_not_matched = value;
    }

    /// Get the bundle for `rule_type` without any fallback.
    pub fn bundle(&self, rule_type: &RuleType) -> Option<&RuleBundle> {
        self.bundles.get(rule_type)
    }

    pub fn bundle_mut(&mut self, rule_type: &RuleType) -> &mut RuleBundle {
        self.bundles.entry(rule_type.clone()).or_default()
    }

    /// All bundles sorted by rule type.
    pub fn bundles(&self) -> Vec<(&RuleType, &RuleBundle)> {
        let mut result = self.bundles.iter().collect::<Vec<_>>();
        result.sort_by(|a, b| a.0.cmp(b.0));
        result
    }

    /// Check whether the base name of `file_name` is selected by this
    /// patchinfo. Selection regexes are tried in order. When an exclusion
    /// regex vetoes a selection regex, the next selection regex is tried.
    pub fn matches(&self, file_name: &str) -> bool {
        let base_name = util::base_name(file_name);

        self.regexes.iter().any(|regex| {
            regex_search(regex, base_name)
                && !self
                    .exclude_regexes
                    .iter()
                    .any(|exclude| regex_search(exclude, base_name))
        })
    }

    /// Pick the rule bundle that applies to `file_name` within this patchinfo.
    pub fn rule_type_for(&self, file_name: &str) -> RuleType {
        let base_name = util::base_name(file_name);

        if let Some(regex) = self
            .cond_regexes
            .iter()
            .find(|r| regex_search(r, base_name))
        {
            RuleType::Regex(regex.clone())
        } else if self.has_not_matched {
            RuleType::NotMatched
        } else {
            RuleType::Default
        }
    }

    fn resolve<'a, T: ?Sized>(
        &'a self,
        rule_type: &RuleType,
        field: impl Fn(&'a RuleBundle) -> Option<&'a T>,
    ) -> Option<&'a T> {
        self.bundle(rule_type)
            .and_then(&field)
            .or_else(|| self.bundle(&RuleType::Default).and_then(&field))
    }

    pub fn resolve_has_boot_image(&self, rule_type: &RuleType) -> Option<bool> {
        self.resolve(rule_type, |b| b.has_boot_image.as_ref())
            .copied()
    }

    pub fn resolve_ramdisk(&self, rule_type: &RuleType) -> Option<&str> {
        self.resolve(rule_type, |b| b.ramdisk.as_deref())
    }

    pub fn resolve_patched_init(&self, rule_type: &RuleType) -> Option<&str> {
        self.resolve(rule_type, |b| b.patched_init.as_deref())
    }

    /// Device checks are enabled unless a bundle explicitly disables them.
    pub fn resolve_device_check(&self, rule_type: &RuleType) -> bool {
        self.resolve(rule_type, |b| b.device_check.as_ref())
            .copied()
            .unwrap_or(true)
    }

    pub fn resolve_autopatchers(&self, rule_type: &RuleType) -> &[(String, AutoPatcherArgs)] {
        self.resolve(rule_type, |b| {
            (!b.autopatchers.is_empty()).then_some(b.autopatchers.as_slice())
        })
        .unwrap_or_default()
    }

    pub fn resolve_partconfigs(&self, rule_type: &RuleType) -> Vec<String> {
        self.resolve(rule_type, |b| {
            (!b.partconfigs.is_empty()).then_some(b.partconfigs.as_slice())
        })
        .map_or_else(|| vec![partconfig::ALL.to_owned()], |t| t.to_vec())
    }

    pub fn supports_partconfig(&self, rule_type: &RuleType, id: &str) -> bool {
        partconfig::is_supported(&self.resolve_partconfigs(rule_type), id)
    }
}

impl fmt::Display for RuleBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(value: Option<T>) -> String {
            value.map_or_else(|| "(unset)".to_owned(), |v| v.to_string())
        }

        writeln!(f, "- Has boot image: {}", opt(self.has_boot_image))?;
        writeln!(f, "- Ramdisk:        {}", opt(self.ramdisk.as_deref()))?;
        writeln!(f, "- Patched init:   {}", opt(self.patched_init.as_deref()))?;
        writeln!(f, "- Device check:   {}", opt(self.device_check))?;
        writeln!(f, "- Partconfigs:    {:?}", self.partconfigs)?;
        write!(f, "- Autopatchers:")?;

        if self.autopatchers.is_empty() {
            write!(f, " (none)")?;
        }
        for (id, args) in &self.autopatchers {
            write!(f, "\n  - {id} {args:?}")?;
        }

        Ok(())
    }
}

impl fmt::Display for PatchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Patchinfo {}:", self.id)?;
        writeln!(f, "- Name:            {}", self.name.as_deref().unwrap_or("(unset)"))?;
        writeln!(f, "- Regexes:         {:?}", self.regexes)?;
        writeln!(f, "- Exclude regexes: {:?}", self.exclude_regexes)?;
        write!(f, "- Has not-matched: {}", self.has_not_matched)?;

        for (rule_type, bundle) in self.bundles() {
            write!(f, "\n\n[{rule_type}]\n{bundle}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatchInfo {
        let mut info = PatchInfo::new();
        info.set_id("jflte/ROMs/Sample");
        info.add_regex(r"^sample-.*\.zip$");

        let default = info.bundle_mut(&RuleType::Default);
        default.has_boot_image = Some(true);
        default.ramdisk = Some("jflte/AOSP".to_owned());
        default.autopatchers.push(("StandardPatcher".to_owned(), AutoPatcherArgs::new()));
        default.partconfigs = vec![partconfig::ALL.to_owned(), "!dual".to_owned()];

        let cond = RuleType::Regex("-gapps".to_owned());
        info.add_cond_regex("-gapps");
        info.add_regex("-gapps");
        info.bundle_mut(&cond).has_boot_image = Some(false);
        info.bundle_mut(&cond).device_check = Some(false);

        info
    }

    #[test]
    fn rule_type_selection() {
        let mut info = sample();
        assert_eq!(
            info.rule_type_for("/tmp/sample-gapps.zip"),
            RuleType::Regex("-gapps".to_owned()),
        );
        assert_eq!(info.rule_type_for("sample-1.zip"), RuleType::Default);

        info.set_has_not_matched(true);
        assert_eq!(info.rule_type_for("sample-1.zip"), RuleType::NotMatched);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let info = sample();
        let cond = RuleType::Regex("-gapps".to_owned());

        assert_eq!(info.resolve_has_boot_image(&cond), Some(false));
        assert_eq!(info.resolve_ramdisk(&cond), Some("jflte/AOSP"));
        assert_eq!(info.resolve_patched_init(&cond), None);
        assert!(!info.resolve_device_check(&cond));
        assert!(info.resolve_device_check(&RuleType::Default));
        assert_eq!(info.resolve_autopatchers(&cond).len(), 1);
        assert!(!info.supports_partconfig(&cond, "dual"));
        assert!(info.supports_partconfig(&cond, "multi-slot-1"));

        // The bundle itself does not fall back.
        assert_eq!(info.bundle(&cond).unwrap().ramdisk, None);
    }

    #[test]
    fn unset_partconfigs_allow_everything() {
        let info = PatchInfo::new();

        assert_eq!(info.resolve_partconfigs(&RuleType::NotMatched), vec!["all"]);
        assert!(info.supports_partconfig(&RuleType::Default, "dual"));
    }

    #[test]
    fn no_regexes_never_match() {
        let mut info = PatchInfo::new();
        info.bundle_mut(&RuleType::Default).has_boot_image = Some(true);

        assert!(!info.matches("anything.zip"));
        assert!(!info.matches(""));
    }

    #[test]
    fn veto_tries_next_regex() {
        let mut info = PatchInfo::new();
        info.add_regex("nightly");
        info.add_regex(r"\.zip$");
        info.add_exclude_regex("nightly");

        // Every selection regex is vetoed by the same exclusion regex.
        assert!(!info.matches("rom-nightly.zip"));
        assert!(info.matches("rom-stable.zip"));
    }
}
