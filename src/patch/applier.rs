//! Structural patch application.
//!
//! Instructions run against the target document in patch order. Nodes a
//! replace or remove takes out are parked in a [`SavedNodes`] map keyed
//! by the instruction's identity hash; a later restore with the same key
//! puts them back exactly where they came from, including taking back out
//! whatever a replace spliced in. One map spans a whole [`apply_patches`]
//! call, so instructions in different patch entries can coordinate.

use crate::patch::cache::PatchEntry;
use crate::patch::instruction::{InsertOrder, Instruction};
use crate::xml::{Document, NodeId, PathExpr};
use std::collections::HashMap;

/// Detached target-document nodes, parked by identity key.
///
/// A parked node is reachable only through this map until a restore
/// reattaches it; the map is discarded when the application pass ends,
/// abandoning anything never restored.
#[derive(Debug, Default)]
pub struct SavedNodes {
    map: HashMap<u64, Vec<SavedNode>>,
}

#[derive(Debug)]
struct SavedNode {
    node: NodeId,
    parent: NodeId,
    index: usize,
    /// What the detaching instruction spliced in; detached again on
    /// restore so the undo is exact.
    inserted: Vec<NodeId>,
}

impl SavedNodes {
    fn save(&mut self, key: u64, entry: SavedNode) {
        self.map.entry(key).or_default().push(entry);
    }

    fn take(&mut self, key: u64) -> Option<Vec<SavedNode>> {
        self.map.remove(&key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Counters for one application pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStats {
    /// Instructions that changed the document.
    pub applied: usize,
    /// Instructions dropped for an unparseable or non-matching path.
    pub skipped: usize,
}

/// Apply `entries` to `doc` in order, returning the pass counters.
#[must_use]
pub fn apply_patches(doc: &mut Document, patches: &Document, entries: &[&PatchEntry]) -> ApplyStats {
    let mut stats = ApplyStats::default();
    let mut saved = SavedNodes::default();
    let root = doc.root();
    for entry in entries {
        patch_node(
            doc,
            patches,
            root,
            &entry.instructions,
            &mut saved,
            &mut stats,
        );
    }
    stats
}

/// The recursive merge primitive: run `instructions` against `context`.
fn patch_node(
    doc: &mut Document,
    patches: &Document,
    context: NodeId,
    instructions: &[Instruction],
    saved: &mut SavedNodes,
    stats: &mut ApplyStats,
) {
    for instruction in instructions {
        match instruction {
            Instruction::Select { path, body } => {
                let Some(targets) = resolve(doc, context, path, stats) else {
                    continue;
                };
                if targets.is_empty() {
                    skip_unmatched(instruction, stats);
                    continue;
                }
                for target in targets {
                    patch_node(doc, patches, target, body, saved, stats);
                }
            }
            Instruction::Replace { path, key, content } => {
                let Some(targets) = resolve(doc, context, path, stats) else {
                    continue;
                };
                if targets.is_empty() {
                    skip_unmatched(instruction, stats);
                    continue;
                }
                for target in targets {
                    detach_and_splice(doc, patches, target, *key, content, saved, stats);
                }
            }
            Instruction::Remove { path, key } => {
                let Some(targets) = resolve(doc, context, path, stats) else {
                    continue;
                };
                if targets.is_empty() {
                    skip_unmatched(instruction, stats);
                    continue;
                }
                for target in targets {
                    detach_and_splice(doc, patches, target, *key, &[], saved, stats);
                }
            }
            Instruction::Restore { path, key } => {
                let Some(parked) = saved.take(*key) else {
                    // Nothing was parked under this key, so there is
                    // nothing to undo.
                    log::debug!("restore '{}': nothing parked, no-op", path);
                    continue;
                };
                // Newest first, so positions recorded earlier stay valid.
                for entry in parked.into_iter().rev() {
                    for spliced in entry.inserted {
                        doc.detach(spliced);
                    }
                    doc.insert_child(entry.parent, entry.index, entry.node);
                    stats.applied += 1;
                }
            }
            Instruction::Insert {
                path,
                order,
                content,
            } => {
                let Some(targets) = resolve(doc, context, path, stats) else {
                    continue;
                };
                if !targets.is_empty() {
                    log::debug!("insert '{}': target already present", path);
                    continue;
                }
                let base = match order {
                    InsertOrder::First => 0,
                    InsertOrder::Last => doc.children(context).len(),
                    InsertOrder::At(index) => (*index).min(doc.children(context).len()),
                };
                for (offset, &template) in content.iter().enumerate() {
                    let copy = doc.import(patches, template);
                    doc.insert_child(context, base + offset, copy);
                }
                stats.applied += 1;
            }
        }
    }
}

/// Detach `target`, splice `content` templates into its place, and park
/// it under `key` with everything needed to undo the edit.
fn detach_and_splice(
    doc: &mut Document,
    patches: &Document,
    target: NodeId,
    key: u64,
    content: &[NodeId],
    saved: &mut SavedNodes,
    stats: &mut ApplyStats,
) {
    let (Some(parent), Some(index)) = (doc.parent(target), doc.position_in_parent(target)) else {
        log::debug!("target has no parent, leaving it alone");
        return;
    };
    doc.detach(target);
    let mut inserted = Vec::with_capacity(content.len());
    for (offset, &template) in content.iter().enumerate() {
        let copy = doc.import(patches, template);
        doc.insert_child(parent, index + offset, copy);
        inserted.push(copy);
    }
    saved.save(
        key,
        SavedNode {
            node: target,
            parent,
            index,
            inserted,
        },
    );
    stats.applied += 1;
}

fn resolve(
    doc: &Document,
    context: NodeId,
    path: &str,
    stats: &mut ApplyStats,
) -> Option<Vec<NodeId>> {
    match PathExpr::parse(path) {
        Ok(expr) => Some(expr.evaluate(doc, context)),
        Err(err) => {
            log::warn!("skipping instruction: {}", err);
            stats.skipped += 1;
            None
        }
    }
}

fn skip_unmatched(instruction: &Instruction, stats: &mut ApplyStats) {
    log::debug!(
        "{} '{}' matched nothing, skipped",
        instruction.kind(),
        instruction.path()
    );
    stats.skipped += 1;
}
