//! # Scanner Module
//!
//! Indexes the raw output of a bulk photo scanner.
//!
//! The device writes up to three files per physical photo:
//! - `name.jpg` - the front
//! - `name_a.jpg` - the enhanced front
//! - `name_b.jpg` - the back
//!
//! Batches land in arbitrary subdirectories, so the same `name` can
//! appear more than once. The index keeps the originating directory of
//! every file so the reorganizer can tell those photos apart.
//!
//! ## Example
//! ```rust,ignore
//! use photo_curator::core::scanner::{ScanConfig, ScanIndexer};
//!
//! let index = ScanIndexer::new(ScanConfig::default()).index(Path::new("/scans"))?;
//! for group in index.groups() {
//!     println!("{} ({} files)", group.basename, group.entries.len());
//! }
//! ```

mod category;
mod classify;
mod filter;
mod walker;

pub use category::{CategoryTree, TreeIdentity, SIDECAR_EXTENSION};
pub use classify::VariantClassifier;
pub use filter::{ImageFilter, DEFAULT_EXTENSIONS};
pub use walker::{ScanConfig, ScanIndexer};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Role an image file plays for its physical photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Front,
    EnhancedFront,
    Back,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Front, Variant::EnhancedFront, Variant::Back];

    /// Name of the category directory holding this variant
    pub fn category_dir(&self) -> &'static str {
        match self {
            Variant::Front => "fronts",
            Variant::EnhancedFront => "enhanced_fronts",
            Variant::Back => "backs",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Front => write!(f, "front"),
            Variant::EnhancedFront => write!(f, "enhanced front"),
            Variant::Back => write!(f, "back"),
        }
    }
}

/// One image file found while indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    /// Absolute path as found
    pub source_path: PathBuf,
    /// Stem with the variant suffix stripped
    pub basename: String,
    pub variant: Variant,
    /// Lower-cased extension without the dot
    pub extension: String,
    /// Directory the file was found in
    pub origin: PathBuf,
    /// Position in the (sorted) walk order
    pub discovery_index: usize,
}

impl ScanEntry {
    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            basename: self.basename.clone(),
            origin: self.origin.clone(),
        }
    }
}

/// One physical photo: a basename within one originating directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub basename: String,
    pub origin: PathBuf,
}

/// All entries sharing a basename, possibly from several directories
#[derive(Debug, Clone)]
pub struct IdentityGroup {
    pub basename: String,
    pub entries: Vec<ScanEntry>,
}

impl IdentityGroup {
    /// Distinct originating directories, sorted
    pub fn origins(&self) -> Vec<PathBuf> {
        let mut origins: Vec<PathBuf> = self.entries.iter().map(|e| e.origin.clone()).collect();
        origins.sort();
        origins.dedup();
        origins
    }

    /// True when the basename appears under more than one directory
    pub fn is_collision(&self) -> bool {
        self.origins().len() > 1
    }
}

/// Non-fatal conditions recorded while indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// A directory or file could not be read
    Unreadable { path: PathBuf, reason: String },
    /// A regular file without a recognized image extension
    UnrecognizedExtension { path: PathBuf },
    /// A second file for an identity/variant slot that is already taken
    DuplicateVariant { path: PathBuf, kept: PathBuf },
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanWarning::Unreadable { path, reason } => {
                write!(f, "skipped unreadable {}: {}", path.display(), reason)
            }
            ScanWarning::UnrecognizedExtension { path } => {
                write!(f, "skipped non-image {}", path.display())
            }
            ScanWarning::DuplicateVariant { path, kept } => write!(
                f,
                "skipped {} (same photo and variant as {})",
                path.display(),
                kept.display()
            ),
        }
    }
}

/// Result of indexing an input tree
#[derive(Debug, Clone)]
pub struct ScanIndex {
    /// Canonicalized input root
    pub root: PathBuf,
    /// Indexed entries in discovery order
    pub entries: Vec<ScanEntry>,
    /// Paths skipped along the way
    pub warnings: Vec<ScanWarning>,
}

impl ScanIndex {
    /// Group entries by basename, ordered by basename
    pub fn groups(&self) -> Vec<IdentityGroup> {
        let mut by_basename: BTreeMap<&str, Vec<ScanEntry>> = BTreeMap::new();
        for entry in &self.entries {
            by_basename
                .entry(entry.basename.as_str())
                .or_default()
                .push(entry.clone());
        }

        by_basename
            .into_iter()
            .map(|(basename, entries)| IdentityGroup {
                basename: basename.to_string(),
                entries,
            })
            .collect()
    }

    /// Number of distinct physical photos
    pub fn identity_count(&self) -> usize {
        let mut keys: Vec<IdentityKey> = self.entries.iter().map(|e| e.identity()).collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(basename: &str, origin: &str, variant: Variant, index: usize) -> ScanEntry {
        ScanEntry {
            source_path: PathBuf::from(origin).join(format!("{basename}.jpg")),
            basename: basename.to_string(),
            variant,
            extension: "jpg".to_string(),
            origin: PathBuf::from(origin),
            discovery_index: index,
        }
    }

    #[test]
    fn category_dirs() {
        assert_eq!(Variant::Front.category_dir(), "fronts");
        assert_eq!(Variant::EnhancedFront.category_dir(), "enhanced_fronts");
        assert_eq!(Variant::Back.category_dir(), "backs");
    }

    #[test]
    fn groups_are_ordered_by_basename() {
        let index = ScanIndex {
            root: PathBuf::from("/scans"),
            entries: vec![
                entry("b", "/scans/x", Variant::Front, 0),
                entry("a", "/scans/x", Variant::Front, 1),
                entry("a", "/scans/x", Variant::Back, 2),
            ],
            warnings: Vec::new(),
        };

        let groups = index.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].basename, "a");
        assert_eq!(groups[0].entries.len(), 2);
        assert!(!groups[0].is_collision());
    }

    #[test]
    fn same_basename_in_two_directories_collides() {
        let index = ScanIndex {
            root: PathBuf::from("/scans"),
            entries: vec![
                entry("a", "/scans/x", Variant::Front, 0),
                entry("a", "/scans/y", Variant::Front, 1),
            ],
            warnings: Vec::new(),
        };

        let groups = index.groups();
        assert!(groups[0].is_collision());
        assert_eq!(index.identity_count(), 2);
    }
}
