//! Asset Patcher: rule-driven patching for game client XML assets
//!
//! Two rule sources feed one pipeline. *Addons* contribute string-level
//! search/replace pairs, loaded from either a legacy `Key=Value` format
//! or a structured XML format. The *patch tree*, composed from include
//! graphs into one cached document, contributes structural instructions
//! addressed by node path expressions. Both route to documents through
//! backslash-normalized wildcard patterns.
//!
//! # Architecture
//!
//! Application per document runs string pass first, structural pass
//! second: [`PatchEngine::patch_document`] routes both rule sources by
//! the document's logical path, rewrites the raw text, then parses and
//! applies instructions only when structural entries routed there.
//!
//! # Safety
//!
//! - One malformed legacy record invalidates its whole addon; one
//!   malformed structured entry is skipped alone
//! - Include graphs with diamonds or cycles compose deterministically,
//!   each file merged at most once
//! - Replaced and removed nodes are parked, not destroyed, so a restore
//!   instruction can put them back exactly
//! - Atomic document writes (tempfile + fsync + rename)
//!
//! # Example
//!
//! ```no_run
//! use asset_patcher::{PatchEngine, PatchOutcome};
//! use std::path::Path;
//!
//! let engine = PatchEngine::load(Path::new("addons"), Path::new("patches.xml"));
//! let bytes = std::fs::read("documents/config.xml").unwrap();
//!
//! match engine.patch_document("config.xml", &bytes) {
//!     Ok(PatchOutcome::Patched(patched)) => {
//!         std::fs::write("documents/config.xml", &patched.bytes).unwrap();
//!     }
//!     Ok(PatchOutcome::Unchanged) => {}
//!     Err(e) => eprintln!("patching failed: {}", e),
//! }
//! ```

pub mod addon;
pub mod engine;
pub mod matching;
pub mod patch;
pub mod xml;

// Re-exports
pub use addon::{Addon, AddonData, AddonError, AddonRepository};
pub use engine::{write_document, EngineError, PatchEngine, PatchOutcome, PatchedDocument};
pub use matching::{normalize_path, pattern_applies, wild_match};
pub use patch::{
    apply_patches, get_or_load, identity_hash, preprocess, ApplyStats, IncludeGuard, Instruction,
    PatchEntry, PatchSet, SavedNodes,
};
pub use xml::{Document, NodeId, NodeKind, ParseError, PathExpr, PathExprError};
