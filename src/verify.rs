//! Staging verification
//!
//! Checks the hook's post-condition on demand: the staging directory must be
//! byte-identical to the build output (same relative paths, same content).
//! Used by `prestage verify` in CI and after manual fiddling with either tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{PrestageError, PrestageResult};

/// What a tree entry is, for comparison purposes.
///
/// Files compare by content hash, symlinks by their target, directories by
/// presence alone.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Dir,
    File { hash: String },
    Symlink { target: PathBuf },
}

/// Result of comparing staging against build output
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// Entries present and identical on both sides
    pub matched: usize,
    /// Relative paths in build output but not in staging
    pub missing: Vec<PathBuf>,
    /// Relative paths in staging but not in build output
    pub extra: Vec<PathBuf>,
    /// Relative paths present on both sides with different content or kind
    pub mismatched: Vec<PathBuf>,
}

impl VerifyReport {
    /// True when staging is byte-identical to build output
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty()
    }

    /// Number of differing entries
    pub fn problem_count(&self) -> usize {
        self.missing.len() + self.extra.len() + self.mismatched.len()
    }
}

/// Compare the staging directory against the build output.
///
/// A missing staging directory is not fatal - every build-output entry is
/// reported missing. A missing build output is fatal: there is nothing to
/// verify against.
pub fn verify_tree(build_output: &Path, staging: &Path) -> PrestageResult<VerifyReport> {
    if !build_output.is_dir() {
        return Err(PrestageError::BuildOutputMissing {
            path: build_output.to_path_buf(),
        });
    }

    let expected = collect_entries(build_output)?;
    let actual = if staging.is_dir() {
        collect_entries(staging)?
    } else {
        BTreeMap::new()
    };

    let mut report = VerifyReport::default();

    for (rel, entry) in &expected {
        match actual.get(rel) {
            None => report.missing.push(rel.clone()),
            Some(other) if other == entry => report.matched += 1,
            Some(_) => report.mismatched.push(rel.clone()),
        }
    }

    for rel in actual.keys() {
        if !expected.contains_key(rel) {
            report.extra.push(rel.clone());
        }
    }

    Ok(report)
}

/// Compute SHA-256 hash of content bytes
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{:x}", hasher.finalize())
}

/// Compute SHA-256 hash of a file
pub fn hash_file(path: &Path) -> PrestageResult<String> {
    let content = fs::read(path)?;
    Ok(hash_content(&content))
}

fn collect_entries(root: &Path) -> PrestageResult<BTreeMap<PathBuf, Entry>> {
    let mut entries = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| PrestageError::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walkdir yields paths under its root")
            .to_path_buf();
        if rel.as_os_str().is_empty() {
            continue;
        }

        let kind = if entry.file_type().is_dir() {
            Entry::Dir
        } else if entry.file_type().is_symlink() {
            Entry::Symlink {
                target: fs::read_link(entry.path())?,
            }
        } else {
            Entry::File {
                hash: hash_file(entry.path())?,
            }
        };
        entries.insert(rel, kind);
    }

    Ok(entries)
}
