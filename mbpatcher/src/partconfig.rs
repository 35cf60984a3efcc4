// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use crate::device::PartitionRole;

/// Token that makes a rule apply to every partition configuration.
pub const ALL: &str = "all";

/// Prefix marking a partition configuration token as excluded.
pub const NEGATE_PREFIX: char = '!';

/// Where a ROM installed with a given configuration lives. The fields are
/// defined by the patcher that provides the configuration and are not
/// interpreted by the resolution logic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Identifier for the kernel slot used by the boot menu.
    pub kernel: String,
    pub target_system: String,
    pub target_cache: String,
    pub target_data: String,
    pub target_system_partition: PartitionRole,
    pub target_cache_partition: PartitionRole,
    pub target_data_partition: PartitionRole,
}

impl fmt::Display for PartitionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Partition config {}:", self.id)?;
        writeln!(f, "- Name:        {}", self.name)?;
        writeln!(f, "- Description: {}", self.description)?;
        writeln!(f, "- Kernel:      {}", self.kernel)?;
        writeln!(
            f,
            "- System:      {} (on {})",
            self.target_system, self.target_system_partition,
        )?;
        writeln!(
            f,
            "- Cache:       {} (on {})",
            self.target_cache, self.target_cache_partition,
        )?;
        write!(
            f,
            "- Data:        {} (on {})",
            self.target_data, self.target_data_partition,
        )
    }
}

fn negated(id: &str) -> String {
    format!("{NEGATE_PREFIX}{id}")
}

/// Remove every token referring to `id`, whether included or excluded.
fn erase(tokens: &mut Vec<String>, id: &str) {
    let negated = negated(id);
    tokens.retain(|t| *t != id && *t != negated);
}

/// Mark `id` as supported. Any earlier directive for `id` is dropped and the
/// new token is moved to the end.
pub fn include(tokens: &mut Vec<String>, id: &str) {
    erase(tokens, id);
    tokens.push(id.to_owned());
}

/// Mark `id` as unsupported. Any earlier directive for `id` is dropped and the
/// new token is moved to the end.
pub fn exclude(tokens: &mut Vec<String>, id: &str) {
    erase(tokens, id);
    tokens.push(negated(id));
}

/// Check whether the partition configuration `id` is allowed by a list of
/// signed tokens. An explicit exclusion wins over everything else, followed
/// by an explicit inclusion and then the [`ALL`] wildcard.
pub fn is_supported(tokens: &[String], id: &str) -> bool {
    let negated = negated(id);

    if tokens.iter().any(|t| *t == negated) {
        false
    } else {
        tokens.iter().any(|t| t == id || t == ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn exclude_is_idempotent() {
        let mut t = tokens(&[ALL]);
        exclude(&mut t, "dual");
        exclude(&mut t, "dual");

        assert_eq!(t, tokens(&[ALL, "!dual"]));
    }

    #[test]
    fn last_directive_wins() {
        let mut t = tokens(&[ALL]);
        include(&mut t, "dual");
        exclude(&mut t, "dual");
        assert_eq!(t, tokens(&[ALL, "!dual"]));

        include(&mut t, "multi-slot-1");
        include(&mut t, "dual");
        assert_eq!(t, tokens(&[ALL, "multi-slot-1", "dual"]));
    }

    #[test]
    fn support_checks() {
        let t = tokens(&[ALL, "!dual"]);
        assert!(!is_supported(&t, "dual"));
        assert!(is_supported(&t, "primaryupgrade"));

        let t = tokens(&["multi-slot-1"]);
        assert!(is_supported(&t, "multi-slot-1"));
        assert!(!is_supported(&t, "multi-slot-2"));

        assert!(!is_supported(&[], "dual"));
    }
}
