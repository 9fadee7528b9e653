//! Structural patches: composition, compilation, caching, application.
//!
//! Patch sources are XML files with a `patches` root. `include` elements
//! splice other files in (each merged at most once per composition), and
//! every `patch` element routes by its `file` pattern to the documents it
//! rewrites through path-addressed instructions.

pub mod applier;
pub mod cache;
pub mod instruction;
pub mod loader;

pub use applier::{apply_patches, ApplyStats, SavedNodes};
pub use cache::{get_or_load, PatchEntry, PatchSet};
pub use instruction::{identity_hash, Instruction, InsertOrder};
pub use loader::{preprocess, IncludeGuard};
