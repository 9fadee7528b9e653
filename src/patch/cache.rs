//! Composed patch tree, compiled entries, and the process-wide cache.

use crate::matching::pattern_applies;
use crate::patch::instruction::{self, Instruction};
use crate::patch::loader::{self, IncludeGuard};
use crate::xml::Document;
use std::path::Path;
use std::sync::OnceLock;

/// One top-level patch: a routing pattern plus compiled instructions.
#[derive(Debug, Clone)]
pub struct PatchEntry {
    pub pattern: String,
    pub instructions: Vec<Instruction>,
}

/// The composed patch tree with its entries compiled once.
///
/// The tree document stays alive for the life of the set because compiled
/// instructions reference template nodes inside it.
#[derive(Debug, Default)]
pub struct PatchSet {
    doc: Document,
    entries: Vec<PatchEntry>,
}

impl PatchSet {
    /// Compose the include graph rooted at `path` and compile it. A
    /// missing root file yields an empty set.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let mut doc = Document::new();
        let mut guard = IncludeGuard::new();
        loader::preprocess(&mut doc, path, &mut guard);
        Self::compile(doc)
    }

    /// Compile an already-composed patch document. Top-level elements
    /// other than `patch`, and `patch` elements without a `file`
    /// attribute, are skipped with a warning.
    #[must_use]
    pub fn compile(doc: Document) -> Self {
        let mut entries = Vec::new();
        for node in doc.element_children(doc.root()) {
            match doc.name(node) {
                Some("patch") => {
                    let Some(pattern) = doc.attribute(node, "file") else {
                        log::warn!("skipping patch element without a file attribute");
                        continue;
                    };
                    entries.push(PatchEntry {
                        pattern: pattern.to_string(),
                        instructions: instruction::compile(&doc, node),
                    });
                }
                Some(other) => {
                    log::warn!("skipping unknown top-level element '{}'", other);
                }
                None => {}
            }
        }
        Self { doc, entries }
    }

    /// The composed tree holding the instruction templates.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose pattern routes to `path`, in composition order.
    #[must_use]
    pub fn relevant(&self, path: &str) -> Vec<&PatchEntry> {
        self.entries
            .iter()
            .filter(|entry| pattern_applies(&entry.pattern, path))
            .collect()
    }
}

/// Process-wide patch cache. The first caller's root path wins and the
/// composition runs at most once, even when first access races across
/// threads; everyone else shares the resulting set.
pub fn get_or_load(path: &Path) -> &'static PatchSet {
    static PATCHES: OnceLock<PatchSet> = OnceLock::new();
    PATCHES.get_or_init(|| PatchSet::load(path))
}
