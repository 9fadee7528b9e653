//! Addon discovery and routing.

use crate::addon::schema::{Addon, AddonError};
use crate::addon::{legacy, structured};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every valid addon found in the addons directory, in sorted file order
/// so rule application is deterministic across runs.
#[derive(Debug, Default)]
pub struct AddonRepository {
    addons: Vec<Addon>,
}

impl AddonRepository {
    /// Scan `dir` (non-recursively) and load every addon source found.
    ///
    /// `.xml` files use the structured format, `.patch` and `.txt` the
    /// legacy format, anything else is ignored. Files that fail to load
    /// or contain no usable rules are skipped with a warning; a missing
    /// directory simply yields an empty repository.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let mut addons = Vec::new();
        if !dir.is_dir() {
            log::debug!("addon directory {} not found", dir.display());
            return Self { addons };
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        for path in files {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            let loaded: Result<Addon, AddonError> = match extension.as_deref() {
                Some("xml") => structured::load(&path),
                Some("patch") | Some("txt") => legacy::load(&path),
                _ => continue,
            };
            match loaded {
                Ok(addon) if addon.is_valid() => {
                    log::debug!(
                        "loaded addon '{}' with {} rule(s) from {}",
                        addon.name(),
                        addon.rule_count(),
                        path.display()
                    );
                    addons.push(addon);
                }
                Ok(_) => {
                    log::warn!("ignoring addon {}: no usable rules", path.display());
                }
                Err(err) => {
                    log::warn!("failed to load addon {}: {}", path.display(), err);
                }
            }
        }
        Self { addons }
    }

    /// Wrap already-built addons; invalid ones are dropped.
    #[must_use]
    pub fn from_addons(addons: Vec<Addon>) -> Self {
        Self {
            addons: addons.into_iter().filter(Addon::is_valid).collect(),
        }
    }

    #[must_use]
    pub fn addons(&self) -> &[Addon] {
        &self.addons
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// Search/replace pairs from every addon whose rules route to `path`,
    /// in addon order then record order.
    #[must_use]
    pub fn relevant_rules(&self, path: &str) -> Vec<&(String, String)> {
        let mut pairs = Vec::new();
        for addon in &self.addons {
            pairs.extend(addon.relevant_rules(path));
        }
        pairs
    }
}
