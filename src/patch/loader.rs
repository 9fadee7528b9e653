//! Include-expanding patch tree composition.

use crate::matching::normalize_path;
use crate::xml::{self, Document};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Files already merged during one composition, tracked by a hash of the
/// canonical path. Shared across the whole include graph so diamonds and
/// cycles collapse to a single visit each.
#[derive(Debug, Default)]
pub struct IncludeGuard {
    visited: HashSet<u64>,
}

impl IncludeGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit; false when the file was merged before.
    fn insert(&mut self, path: &Path) -> bool {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let normalized = normalize_path(&canonical.to_string_lossy());
        self.visited.insert(xxh3_64(normalized.as_bytes()))
    }
}

/// Merge the patch file at `path` into `patches`, then recurse into its
/// include directives depth-first, in document order.
///
/// A file visits at most once per guard; revisits are silently dropped.
/// A missing or unparseable file is skipped with a warning and the
/// composition continues, so one broken source never takes down the
/// whole tree.
pub fn preprocess(patches: &mut Document, path: &Path, guard: &mut IncludeGuard) {
    if !guard.insert(path) {
        log::debug!("already merged {}", path.display());
        return;
    }
    let source = match xml::parse_file(path) {
        Ok(doc) => doc,
        Err(err) => {
            log::warn!("skipping patch source {}: {}", path.display(), err);
            return;
        }
    };
    let Some(root) = source.document_element() else {
        return;
    };
    if source.name(root) != Some("patches") {
        log::warn!(
            "skipping {}: root element is '{}', expected 'patches'",
            path.display(),
            source.name(root).unwrap_or("")
        );
        return;
    }

    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    for &child in source.children(root) {
        if source.name(child) == Some("include") {
            match source.attribute(child, "path") {
                Some(include) => preprocess(patches, &resolve_include(&base, include), guard),
                None => log::warn!(
                    "include without a path attribute in {}",
                    path.display()
                ),
            }
        } else if source.is_element(child) {
            let imported = patches.import(&source, child);
            let target_root = patches.root();
            patches.append_child(target_root, imported);
        }
    }
}

/// Includes are written relative to the file containing them; backslash
/// separators are accepted either way.
fn resolve_include(base: &Path, include: &str) -> PathBuf {
    if include.contains('\\') {
        base.join(include.split(['/', '\\']).collect::<PathBuf>())
    } else {
        base.join(include)
    }
}
