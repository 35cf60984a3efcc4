// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Loader for patchinfo XML description files.
//!
//! Problems with individual tags are reported as [`Warning`]s and the affected
//! field is left at its default. Only documents that are not well-formed XML
//! (or cannot be read) are fatal.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    partconfig,
    patchinfo::{AutoPatcherArgs, PatchInfo, RuleType},
    util,
};

/// Extension of description files.
pub const EXTENSION: &str = "xml";

const TAG_PATCHINFO: &str = "patchinfo";
const TAG_MATCHES: &str = "matches";
const TAG_NOT_MATCHED: &str = "not-matched";
const TAG_NAME: &str = "name";
const TAG_REGEX: &str = "regex";
const TAG_EXCLUDE_REGEX: &str = "exclude-regex";
const TAG_REGEXES: &str = "regexes";
const TAG_HAS_BOOT_IMAGE: &str = "has-boot-image";
const TAG_RAMDISK: &str = "ramdisk";
const TAG_PATCHED_INIT: &str = "patched-init";
const TAG_AUTOPATCHERS: &str = "autopatchers";
const TAG_AUTOPATCHER: &str = "autopatcher";
const TAG_DEVICE_CHECK: &str = "device-check";
const TAG_PARTCONFIGS: &str = "partconfigs";
const TAG_INCLUDE: &str = "include";
const TAG_EXCLUDE: &str = "exclude";

const ATTR_REGEX: &str = "regex";

const TEXT_TRUE: &str = "true";
const TEXT_FALSE: &str = "false";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read patchinfo: {0:?}")]
    File(PathBuf, #[source] io::Error),
    #[error("Failed to parse patchinfo: {0:?}")]
    XmlParse(PathBuf, #[source] roxmltree::Error),
    #[error("Patchinfo ID is already registered: {0:?}")]
    DuplicatePatchInfo(String),
}

type Result<T> = std::result::Result<T, Error>;

/// A recoverable problem found while loading description files.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("Cannot list directory: {0}")]
    DirectoryUnreadable(String),
    #[error("Skipping unreadable entry: {0}")]
    EntryUnreadable(String),
    #[error("Skipping file with non-UTF-8 path")]
    NonUtf8Path,
    #[error("Unknown tag: <{0}>")]
    UnknownRootTag(String),
    #[error("Nested <{0}> is not allowed")]
    NestedTag(&'static str),
    #[error("Unrecognized tag within <{parent}>: <{tag}>")]
    UnrecognizedTag { parent: &'static str, tag: String },
    #[error("<{tag}> element has no {attr:?} attribute")]
    MissingAttribute {
        tag: &'static str,
        attr: &'static str,
    },
    #[error("<{0}> tag has no text")]
    NoText(&'static str),
    #[error("Ignoring additional <{0}> elements")]
    Duplicate(&'static str),
    #[error("Unknown value for <{tag}>: {value:?}")]
    InvalidBool { tag: &'static str, value: String },
}

/// A [`Warning`] along with the file it was found in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub warning: Warning,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.path, self.warning)
    }
}

/// The result of a parse that may partially succeed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parsed<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn texts<'a>(node: Node<'a, '_>) -> impl Iterator<Item = &'a str> {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
}

/// Which bundle-level scope the parser is currently in. Used to reject
/// recursive scoping.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Matches,
    NotMatched,
}

impl Scope {
    fn tag(self) -> &'static str {
        match self {
            Self::Root => TAG_PATCHINFO,
            Self::Matches => TAG_MATCHES,
            Self::NotMatched => TAG_NOT_MATCHED,
        }
    }
}

#[derive(Default)]
struct PatchInfoParser {
    info: PatchInfo,
    warnings: Vec<Warning>,
}

impl PatchInfoParser {
    fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    fn unrecognized(&mut self, parent: &'static str, node: Node) {
        self.warn(Warning::UnrecognizedTag {
            parent,
            tag: node.tag_name().name().to_owned(),
        });
    }

    /// Invoke `f` for every text child of `node`, warning if there are none.
    fn for_each_text(
        &mut self,
        node: Node,
        tag: &'static str,
        mut f: impl FnMut(&mut Self, &str),
    ) {
        let mut has_text = false;

        for text in texts(node) {
            has_text = true;
            f(self, text);
        }

        if !has_text {
            self.warn(Warning::NoText(tag));
        }
    }

    fn parse_root(&mut self, node: Node) {
        for child in elements(node) {
            match child.tag_name().name() {
                TAG_PATCHINFO => self.warn(Warning::NestedTag(TAG_PATCHINFO)),
                TAG_MATCHES => self.parse_matches(child),
                TAG_NOT_MATCHED => self.parse_not_matched(child),
                TAG_NAME => self.parse_name(child),
                TAG_REGEX => self.parse_regex(child),
                TAG_REGEXES => self.parse_regexes(child),
                _ => self.parse_rule_field(Scope::Root, child, &RuleType::Default),
            }
        }
    }

    fn parse_matches(&mut self, node: Node) {
        let Some(regex) = node.attribute(ATTR_REGEX) else {
            self.warn(Warning::MissingAttribute {
                tag: TAG_MATCHES,
                attr: ATTR_REGEX,
            });
            return;
        };

        self.info.add_cond_regex(regex);
        self.info.add_regex(regex);

        let rule_type = RuleType::Regex(regex.to_owned());
        // Register the bundle even if it ends up empty.
        self.info.bundle_mut(&rule_type);

        for child in elements(node) {
            if child.tag_name().name() == TAG_MATCHES {
                self.warn(Warning::NestedTag(TAG_MATCHES));
            } else {
                self.parse_rule_field(Scope::Matches, child, &rule_type);
            }
        }
    }

    fn parse_not_matched(&mut self, node: Node) {
        self.info.set_has_not_matched(true);
        self.info.bundle_mut(&RuleType::NotMatched);

        for child in elements(node) {
            if child.tag_name().name() == TAG_NOT_MATCHED {
                self.warn(Warning::NestedTag(TAG_NOT_MATCHED));
            } else {
                self.parse_rule_field(Scope::NotMatched, child, &RuleType::NotMatched);
            }
        }
    }

    fn parse_name(&mut self, node: Node) {
        self.for_each_text(node, TAG_NAME, |p, text| {
            if p.info.name().is_none() {
                p.info.set_name(text);
            } else {
                p.warn(Warning::Duplicate(TAG_NAME));
            }
        });
    }

    fn parse_regex(&mut self, node: Node) {
        self.for_each_text(node, TAG_REGEX, |p, text| p.info.add_regex(text));
    }

    fn parse_exclude_regex(&mut self, node: Node) {
        self.for_each_text(node, TAG_EXCLUDE_REGEX, |p, text| {
            p.info.add_exclude_regex(text);
        });
    }

    fn parse_regexes(&mut self, node: Node) {
        for child in elements(node) {
            match child.tag_name().name() {
                TAG_REGEXES => self.warn(Warning::NestedTag(TAG_REGEXES)),
                TAG_REGEX => self.parse_regex(child),
                TAG_EXCLUDE_REGEX => self.parse_exclude_regex(child),
                _ => self.unrecognized(TAG_REGEXES, child),
            }
        }
    }

    /// Parse a tag that sets a field in the bundle for `rule_type`.
    fn parse_rule_field(&mut self, scope: Scope, node: Node, rule_type: &RuleType) {
        match node.tag_name().name() {
            TAG_HAS_BOOT_IMAGE => self.parse_bool(node, TAG_HAS_BOOT_IMAGE, rule_type),
            TAG_DEVICE_CHECK => self.parse_bool(node, TAG_DEVICE_CHECK, rule_type),
            TAG_RAMDISK => self.parse_single(node, TAG_RAMDISK, rule_type),
            TAG_PATCHED_INIT => self.parse_single(node, TAG_PATCHED_INIT, rule_type),
            TAG_AUTOPATCHERS => self.parse_autopatchers(node, rule_type),
            TAG_PARTCONFIGS => self.parse_partconfigs(node, rule_type),
            _ => self.unrecognized(scope.tag(), node),
        }
    }

    fn parse_bool(&mut self, node: Node, tag: &'static str, rule_type: &RuleType) {
        self.for_each_text(node, tag, |p, text| {
            let value = match text {
                TEXT_TRUE => true,
                TEXT_FALSE => false,
                _ => {
                    p.warn(Warning::InvalidBool {
                        tag,
                        value: text.to_owned(),
                    });
                    return;
                }
            };

            let bundle = p.info.bundle_mut(rule_type);
            if tag == TAG_HAS_BOOT_IMAGE {
                bundle.has_boot_image = Some(value);
            } else {
                bundle.device_check = Some(value);
            }
        });
    }

    fn parse_single(&mut self, node: Node, tag: &'static str, rule_type: &RuleType) {
        self.for_each_text(node, tag, |p, text| {
            let bundle = p.info.bundle_mut(rule_type);
            let field = if tag == TAG_RAMDISK {
                &mut bundle.ramdisk
            } else {
                &mut bundle.patched_init
            };

            if field.is_none() {
                *field = Some(text.to_owned());
            } else {
                p.warn(Warning::Duplicate(tag));
            }
        });
    }

    fn parse_autopatchers(&mut self, node: Node, rule_type: &RuleType) {
        for child in elements(node) {
            match child.tag_name().name() {
                TAG_AUTOPATCHERS => self.warn(Warning::NestedTag(TAG_AUTOPATCHERS)),
                TAG_AUTOPATCHER => self.parse_autopatcher(child, rule_type),
                _ => self.unrecognized(TAG_AUTOPATCHERS, child),
            }
        }
    }

    fn parse_autopatcher(&mut self, node: Node, rule_type: &RuleType) {
        let args = node
            .attributes()
            .map(|a| (a.name().to_owned(), a.value().to_owned()))
            .collect::<AutoPatcherArgs>();

        self.for_each_text(node, TAG_AUTOPATCHER, |p, text| {
            p.info
                .bundle_mut(rule_type)
                .autopatchers
                .push((text.to_owned(), args.clone()));
        });
    }

    fn parse_partconfigs(&mut self, node: Node, rule_type: &RuleType) {
        let bundle = self.info.bundle_mut(rule_type);
        if bundle.partconfigs.is_empty() {
            bundle.partconfigs.push(partconfig::ALL.to_owned());
        }

        for child in elements(node) {
            match child.tag_name().name() {
                TAG_PARTCONFIGS => self.warn(Warning::NestedTag(TAG_PARTCONFIGS)),
                TAG_INCLUDE => self.for_each_text(child, TAG_INCLUDE, |p, text| {
                    partconfig::include(&mut p.info.bundle_mut(rule_type).partconfigs, text);
                }),
                TAG_EXCLUDE => self.for_each_text(child, TAG_EXCLUDE, |p, text| {
                    partconfig::exclude(&mut p.info.bundle_mut(rule_type).partconfigs, text);
                }),
                _ => self.unrecognized(TAG_PARTCONFIGS, child),
            }
        }
    }
}

/// Parse the contents of a description file. The returned patchinfo has no ID
/// set. If the root element is not `<patchinfo>`, a warning is reported and no
/// patchinfo is returned.
pub fn parse_patchinfo(
    data: &str,
) -> std::result::Result<Parsed<Option<PatchInfo>>, roxmltree::Error> {
    let document = Document::parse(data)?;
    let root = document.root_element();
    let mut parser = PatchInfoParser::default();

    if root.tag_name().name() != TAG_PATCHINFO {
        parser.warn(Warning::UnknownRootTag(root.tag_name().name().to_owned()));

        return Ok(Parsed {
            value: None,
            warnings: parser.warnings,
        });
    }

    parser.parse_root(root);

    Ok(Parsed {
        value: Some(parser.info),
        warnings: parser.warnings,
    })
}

/// Load a single description file and assign it the ID `id`.
pub fn load_file(path: &Path, id: &str) -> Result<Parsed<Option<PatchInfo>>> {
    let data = fs::read_to_string(path).map_err(|e| Error::File(path.to_owned(), e))?;
    let mut parsed = parse_patchinfo(&data).map_err(|e| Error::XmlParse(path.to_owned(), e))?;

    if let Some(info) = &mut parsed.value {
        info.set_id(id);
    }

    Ok(parsed)
}

fn report(diagnostics: &mut Vec<Diagnostic>, path: &Path, warnings: Vec<Warning>) {
    for warning in warnings {
        let diagnostic = Diagnostic {
            path: path.to_owned(),
            warning,
        };
        warn!("{diagnostic}");
        diagnostics.push(diagnostic);
    }
}

/// Load every description file under `root` and append the results to
/// `patch_infos`.
///
/// A root directory that cannot be listed yields a single warning and loads
/// nothing. Entries below it that cannot be read are skipped with a warning.
/// If any file fails to load, loading stops immediately. Patchinfos from
/// earlier files are left in `patch_infos`, but the caller should treat the
/// whole operation as failed.
pub fn load_dir(root: &Path, patch_infos: &mut Vec<PatchInfo>) -> Result<Vec<Diagnostic>> {
    let mut diagnostics = vec![];

    let walked = match util::walk_files(root) {
        Ok(w) => w,
        Err(e) => {
            report(
                &mut diagnostics,
                root,
                vec![Warning::DirectoryUnreadable(e.to_string())],
            );
            return Ok(diagnostics);
        }
    };

    for e in walked.skipped {
        let path = e.path().unwrap_or(root).to_owned();
        report(
            &mut diagnostics,
            &path,
            vec![Warning::EntryUnreadable(e.to_string())],
        );
    }

    for path in walked.files {
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            trace!("Skipping non-patchinfo file: {path:?}");
            continue;
        }

        // Paths returned by the walk are always under the root.
        let Some(id) = util::relative_id(root, &path) else {
            report(&mut diagnostics, &path, vec![Warning::NonUtf8Path]);
            continue;
        };

        if patch_infos.iter().any(|i| i.id() == id) {
            return Err(Error::DuplicatePatchInfo(id));
        }

        let parsed = load_file(&path, &id)?;
        report(&mut diagnostics, &path, parsed.warnings);

        if let Some(info) = parsed.value {
            debug!("Loaded patchinfo: {id}");
            patch_infos.push(info);
        }
    }

    Ok(diagnostics)
}
