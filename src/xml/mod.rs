//! XML document model, parser, serializer and path expressions.
//!
//! Client asset files use a narrow XML feature set; this module covers
//! exactly that subset in one place so parse and serialize behavior stays
//! predictable across patch runs.

pub mod errors;
pub mod node;
pub mod parser;
pub mod printer;
pub mod xpath;

pub use errors::{ParseError, PathExprError};
pub use node::{Attribute, Document, NodeId, NodeKind};
pub use parser::{parse, parse_file, parse_str};
pub use printer::{serialize, serialize_node};
pub use xpath::PathExpr;
