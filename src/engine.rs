//! End-to-end document patching.
//!
//! The pipeline per document: route addon rules and patch entries by the
//! document's logical path, run the string-level search/replace pass,
//! then (only when structural entries routed) parse, apply instructions,
//! and serialize. Documents nothing routes to are reported unchanged
//! without ever being parsed.

use crate::addon::AddonRepository;
use crate::patch::{applier, ApplyStats, PatchSet};
use crate::xml::{self, ParseError};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("document '{path}' is not valid UTF-8")]
    Encoding { path: String },

    #[error("failed to parse document '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// What happened to one document.
#[derive(Debug)]
#[must_use]
pub enum PatchOutcome {
    /// Nothing routed to the document, or every routed rule was a no-op.
    Unchanged,
    Patched(PatchedDocument),
}

/// A modified document plus the counters behind the change.
#[derive(Debug)]
pub struct PatchedDocument {
    pub bytes: Vec<u8>,
    /// Search/replace rules that actually changed text.
    pub replacements: usize,
    /// Structural instruction counters.
    pub stats: ApplyStats,
}

/// A loaded rule universe: one addon repository plus one patch set.
#[derive(Debug, Default)]
pub struct PatchEngine {
    repository: AddonRepository,
    patches: PatchSet,
}

impl PatchEngine {
    #[must_use]
    pub fn new(repository: AddonRepository, patches: PatchSet) -> Self {
        Self {
            repository,
            patches,
        }
    }

    /// Load addons from `addons_dir` and compose the patch tree rooted at
    /// `patches_root`. Either side may be missing; the engine then runs
    /// with whatever loaded.
    #[must_use]
    pub fn load(addons_dir: &Path, patches_root: &Path) -> Self {
        Self {
            repository: AddonRepository::load(addons_dir),
            patches: PatchSet::load(patches_root),
        }
    }

    #[must_use]
    pub fn repository(&self) -> &AddonRepository {
        &self.repository
    }

    #[must_use]
    pub fn patches(&self) -> &PatchSet {
        &self.patches
    }

    /// Patch the document at logical path `path` (the backslash-separated
    /// form addon patterns route against), given its raw bytes.
    pub fn patch_document(&self, path: &str, bytes: &[u8]) -> Result<PatchOutcome, EngineError> {
        let rules = self.repository.relevant_rules(path);
        let entries = self.patches.relevant(path);
        if rules.is_empty() && entries.is_empty() {
            return Ok(PatchOutcome::Unchanged);
        }

        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|_| EngineError::Encoding {
            path: path.to_string(),
        })?;

        // String pass first, exactly as authored, oldest addon first.
        let mut replacements = 0usize;
        let mut current = std::borrow::Cow::Borrowed(text);
        for &pair in &rules {
            let (search, replace) = (pair.0.as_str(), pair.1.as_str());
            if search.is_empty() {
                log::debug!("ignoring rule with empty search text for '{}'", path);
                continue;
            }
            if current.contains(search) {
                current = std::borrow::Cow::Owned(current.replace(search, replace));
                replacements += 1;
            }
        }

        if entries.is_empty() {
            if replacements == 0 {
                return Ok(PatchOutcome::Unchanged);
            }
            return Ok(PatchOutcome::Patched(PatchedDocument {
                bytes: current.into_owned().into_bytes(),
                replacements,
                stats: ApplyStats::default(),
            }));
        }

        // Structural pass over the parsed document.
        let mut doc = xml::parse_str(&current).map_err(|source| EngineError::Parse {
            path: path.to_string(),
            source,
        })?;
        let stats = applier::apply_patches(&mut doc, self.patches.document(), &entries);
        if replacements == 0 && stats.applied == 0 {
            return Ok(PatchOutcome::Unchanged);
        }
        Ok(PatchOutcome::Patched(PatchedDocument {
            bytes: xml::serialize(&doc).into_bytes(),
            replacements,
            stats,
        }))
    }
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
/// Either the full write lands or the original document is untouched.
pub fn write_document(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
