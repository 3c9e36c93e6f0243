//! Reading a tree that already has the category layout.
//!
//! Both the deduplicator and the collection builder start from a
//! directory holding `fronts/`, `enhanced_fronts/` and `backs/`. An
//! identity there is simply a file stem shared across the categories.

use super::{filter::ImageFilter, Variant};
use crate::error::ScanError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Extension of metadata sidecars stored next to images
pub const SIDECAR_EXTENSION: &str = "xmp";

/// All files of one identity in a category tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeIdentity {
    pub files: BTreeMap<Variant, PathBuf>,
}

impl TreeIdentity {
    /// The image a fingerprint is taken from: the front, else the enhanced front
    pub fn primary(&self) -> Option<&Path> {
        self.files
            .get(&Variant::Front)
            .or_else(|| self.files.get(&Variant::EnhancedFront))
            .map(PathBuf::as_path)
    }
}

/// Contents of a category tree
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    /// Identities keyed by basename
    pub identities: BTreeMap<String, TreeIdentity>,
    /// `.xmp` sidecars found next to the images
    pub sidecars: Vec<(Variant, PathBuf)>,
    pub warnings: Vec<String>,
}

impl CategoryTree {
    /// Read `root/{fronts,enhanced_fronts,backs}`.
    ///
    /// Missing category directories count as empty. Names are visited in
    /// sorted order; a second image with an already-seen stem in the same
    /// category is skipped with a warning.
    pub fn read(root: &Path, filter: &ImageFilter) -> Result<Self, ScanError> {
        let mut tree = CategoryTree::default();

        for variant in Variant::ALL {
            let dir = root.join(variant.category_dir());
            if !dir.is_dir() {
                continue;
            }

            let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
                .map_err(|source| ScanError::ReadDirectory {
                    path: dir.clone(),
                    source,
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && !filter.is_excluded_hidden(path))
                .collect();
            paths.sort();

            for path in paths {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                    tree.warnings
                        .push(format!("skipped {}: file name is not valid UTF-8", path.display()));
                    continue;
                };

                let is_sidecar = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(SIDECAR_EXTENSION));
                if is_sidecar {
                    tree.sidecars.push((variant, path));
                    continue;
                }

                if filter.image_extension(&path).is_none() {
                    tree.warnings.push(format!("skipped non-image {}", path.display()));
                    continue;
                }

                let identity = tree.identities.entry(stem).or_default();
                if let Some(kept) = identity.files.get(&variant) {
                    warn!(path = %path.display(), kept = %kept.display(), "duplicate stem in category");
                    tree.warnings.push(format!(
                        "skipped {} (same photo and variant as {})",
                        path.display(),
                        kept.display()
                    ));
                    continue;
                }
                identity.files.insert(variant, path);
            }
        }

        Ok(tree)
    }

    /// Number of image files across all identities
    pub fn image_count(&self) -> usize {
        self.identities.values().map(|i| i.files.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn identities_span_categories() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "fronts/a.jpg");
        touch(temp.path(), "backs/a.jpg");
        touch(temp.path(), "enhanced_fronts/b.jpg");
        touch(temp.path(), "fronts/a.xmp");
        touch(temp.path(), "manifest.json");

        let tree = CategoryTree::read(temp.path(), &ImageFilter::new()).unwrap();

        assert_eq!(tree.identities.len(), 2);
        assert_eq!(tree.identities["a"].files.len(), 2);
        assert!(tree.identities["a"].primary().unwrap().ends_with("fronts/a.jpg"));
        assert!(tree.identities["b"].primary().unwrap().ends_with("enhanced_fronts/b.jpg"));
        assert_eq!(tree.sidecars.len(), 1);
        assert_eq!(tree.image_count(), 3);
    }

    #[test]
    fn back_only_identity_has_no_primary() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "backs/lonely.jpg");

        let tree = CategoryTree::read(temp.path(), &ImageFilter::new()).unwrap();
        assert!(tree.identities["lonely"].primary().is_none());
    }

    #[test]
    fn missing_categories_are_empty() {
        let temp = TempDir::new().unwrap();
        let tree = CategoryTree::read(temp.path(), &ImageFilter::new()).unwrap();
        assert!(tree.identities.is_empty());
        assert!(tree.warnings.is_empty());
    }

    #[test]
    fn second_image_with_same_stem_is_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "fronts/a.jpg");
        touch(temp.path(), "fronts/a.png");

        let tree = CategoryTree::read(temp.path(), &ImageFilter::new()).unwrap();
        assert!(tree.identities["a"].files[&Variant::Front].ends_with("a.jpg"));
        assert_eq!(tree.warnings.len(), 1);
    }
}
