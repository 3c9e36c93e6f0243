//! # Collection Module
//!
//! Versioned, tag-seeded copies of a category tree.
//!
//! ```text
//! collections_root/
//!   family/
//!     0000/
//!       fronts/ enhanced_fronts/ backs/   images plus one .xmp per image
//!       provenance.json
//!       VERSION
//! ```
//!
//! A version directory is complete once it holds `VERSION`; readers such
//! as [`list_collections`] ignore directories without it.

mod builder;
mod provenance;
mod version;

pub use builder::CollectionBuilder;
pub use provenance::{Provenance, PROVENANCE_FILE, VERSION_FILE};
pub use version::{existing_versions, next_version, Version};

use crate::core::output::LinkMode;
use crate::core::scanner::{CategoryTree, ImageFilter};
use crate::error::CollectionError;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Options for building a collection version
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Tags seeded into every sidecar; keys without a prefix go to `dc`
    pub tags: Vec<(String, String)>,
    /// Build this version instead of the next free one
    pub version: Option<Version>,
    pub link_mode: LinkMode,
    pub filter: ImageFilter,
}

impl InitOptions {
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn link_mode(mut self, mode: LinkMode) -> Self {
        self.link_mode = mode;
        self
    }

    pub fn filter(mut self, filter: ImageFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Result of building a collection version
#[derive(Debug, Clone)]
pub struct InitResult {
    pub collection: String,
    pub version: Version,
    pub path: PathBuf,
    pub photos: usize,
    pub files_written: usize,
    pub sidecars_created: usize,
    pub sidecars_updated: usize,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

/// A finished collection version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub version: Version,
    pub path: PathBuf,
    pub photos: usize,
}

/// Collection names become directory names, so they must be a single plain component
pub(crate) fn validate_name(name: &str) -> Result<(), CollectionError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name.trim() == name
        && !name
            .chars()
            .any(|c| c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'));
    if valid {
        Ok(())
    } else {
        Err(CollectionError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Every finished version under `collections_root`, by name then version.
///
/// A missing root has no collections.
pub fn list_collections(collections_root: &Path) -> Result<Vec<CollectionInfo>, CollectionError> {
    let read = |path: &Path| match fs::read_dir(path) {
        Ok(entries) => {
            let mut dirs: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_dir())
                .collect();
            dirs.sort();
            Ok(dirs)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(CollectionError::Read {
            path: path.to_path_buf(),
            source,
        }),
    };

    let filter = ImageFilter::new();
    let mut collections = Vec::new();
    for collection_dir in read(collections_root)? {
        let Some(name) = collection_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        for version_dir in read(&collection_dir)? {
            let marker = version_dir.join(VERSION_FILE);
            let Ok(contents) = fs::read_to_string(&marker) else {
                continue;
            };
            let version: Version = match contents.trim().parse() {
                Ok(version) => version,
                Err(e) => {
                    warn!(path = %marker.display(), error = %e, "skipping version with bad marker");
                    continue;
                }
            };
            let photos = CategoryTree::read(&version_dir, &filter)
                .map(|tree| tree.identities.len())
                .unwrap_or(0);
            collections.push(CollectionInfo {
                name: name.to_string(),
                version,
                path: version_dir,
                photos,
            });
        }
    }
    Ok(collections)
}
