//! Addon data model shared by both on-disk formats.

use crate::matching::pattern_applies;
use crate::xml::ParseError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while loading an addon source file. A file that loads
/// but contains no usable rules is not an error, it is an invalid addon.
#[derive(Debug, Error)]
pub enum AddonError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// One committed rule record: the search/replace pairs in author order
/// plus the author's description of the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonData {
    pub snr: Vec<(String, String)>,
    pub description: String,
}

/// A loaded addon: rule records keyed by normalized path pattern.
///
/// Built once per source file at repository load and immutable afterwards.
/// A later record for the same pattern overwrites the earlier one.
#[derive(Debug, Clone)]
pub struct Addon {
    name: String,
    rules: BTreeMap<String, AddonData>,
}

impl Addon {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: BTreeMap::new(),
        }
    }

    pub(crate) fn insert_rule(&mut self, pattern: String, data: AddonData) {
        self.rules.insert(pattern, data);
    }

    pub(crate) fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// The source file's base name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// An addon is valid iff it holds at least one rule record.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.rules.is_empty()
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rule records in stable (pattern-sorted) order.
    pub fn rules(&self) -> impl Iterator<Item = (&String, &AddonData)> {
        self.rules.iter()
    }

    /// Collect the search/replace pairs of every record whose pattern
    /// routes to `path`, in record order.
    #[must_use]
    pub fn relevant_rules(&self, path: &str) -> Vec<&(String, String)> {
        let mut pairs = Vec::new();
        for (pattern, data) in &self.rules {
            if pattern_applies(pattern, path) {
                pairs.extend(data.snr.iter());
            }
        }
        pairs
    }
}
