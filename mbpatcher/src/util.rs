/*
 * SPDX-FileCopyrightText: 2026 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Get the final component of a `/`- or `\`-separated path. If the path ends
/// with a separator, an empty string is returned. This does not perform any
/// filesystem operations.
pub fn base_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Convert `path` to an identifier relative to `root`. Path components are
/// joined with `/` and the extension of the final component is removed.
/// Returns [`None`] if `path` is not inside `root` or is not valid UTF-8.
pub fn relative_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let mut id = String::new();

    for component in relative.components() {
        let Component::Normal(c) = component else {
            return None;
        };

        if !id.is_empty() {
            id.push('/');
        }
        id.push_str(c.to_str()?);
    }

    (!id.is_empty()).then_some(id)
}

/// Regular files found by [`walk_files`] along with the entries that could not
/// be inspected.
#[derive(Debug, Default)]
pub struct WalkedFiles {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<walkdir::Error>,
}

/// Recursively list regular files under `dir`, following symlinks. Entries
/// within each directory are visited in sorted order so that the result is
/// reproducible. Only a failure to read `dir` itself is an error. Entries
/// below it that cannot be read are returned in [`WalkedFiles::skipped`].
pub fn walk_files(dir: &Path) -> Result<WalkedFiles, walkdir::Error> {
    let mut result = WalkedFiles::default();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() {
                    result.files.push(entry.into_path());
                }
            }
            Err(e) if e.depth() == 0 => return Err(e),
            Err(e) => result.skipped.push(e),
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(base_name("/sdcard/Download/rom.zip"), "rom.zip");
        assert_eq!(base_name(r"C:\Users\me\rom.zip"), "rom.zip");
        assert_eq!(base_name("rom.zip"), "rom.zip");
        assert_eq!(base_name("dir/"), "");
    }

    #[test]
    fn relative_id_strips_extension() {
        let root = Path::new("/data/patchinfos");

        assert_eq!(
            relative_id(root, Path::new("/data/patchinfos/jflte/ROMs/Foo.xml")).as_deref(),
            Some("jflte/ROMs/Foo"),
        );
        assert_eq!(
            relative_id(root, Path::new("/data/patchinfos/Other.v2.xml")).as_deref(),
            Some("Other.v2"),
        );
        assert_eq!(relative_id(root, Path::new("/elsewhere/Foo.xml")), None);
    }

    #[test]
    fn walk_files_is_sorted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("b/c")).unwrap();
        fs::write(root.join("b/c/z.xml"), "").unwrap();
        fs::write(root.join("b/a.xml"), "").unwrap();
        fs::write(root.join("a.xml"), "").unwrap();

        let files = walk_files(root)
            .unwrap()
            .files
            .into_iter()
            .map(|p| relative_id(root, &p).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(files, ["a", "b/a", "b/c/z"]);
    }

    #[cfg(unix)]
    #[test]
    fn walk_files_skips_broken_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.xml"), "").unwrap();
        std::os::unix::fs::symlink(root.join("missing"), root.join("b.xml")).unwrap();
        fs::write(root.join("c.xml"), "").unwrap();

        let walked = walk_files(root).unwrap();

        assert_eq!(walked.files, [root.join("a.xml"), root.join("c.xml")]);
        assert_eq!(walked.skipped.len(), 1);
        assert_eq!(walked.skipped[0].path(), Some(root.join("b.xml").as_path()));

        assert!(walk_files(&root.join("missing")).is_err());
    }
}
