//! Search-and-replace addons.
//!
//! An addon maps document path patterns to ordered search/replace pairs.
//! Two source formats exist side by side: the legacy `Key=Value` text
//! format with all-or-nothing validation, and the structured XML format
//! that recovers per entry. Routing to documents happens through the
//! repository.

pub mod legacy;
pub mod repository;
pub mod schema;
pub mod structured;

pub use repository::AddonRepository;
pub use schema::{Addon, AddonData, AddonError};
