//! Reorganization of scanner output into category directories.
//!
//! `fronts/`, `enhanced_fronts/` and `backs/` receive one file per
//! identity and variant. Basenames that occur in several source
//! directories get `_0`, `_1`, ... suffixes, and every variant of a
//! photo gets the same suffix.

mod executor;
mod manifest;
mod planner;

pub use executor::Reorganizer;
pub use manifest::{ManifestEntry, ReorganizeManifest, MANIFEST_FILE};
pub use planner::{RenameMapping, RenamePlanner};

use crate::core::scanner::{ScanWarning, Variant};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Operation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Copy files to the output (keep originals)
    #[default]
    Copy,
    /// Remove the originals once the whole output is committed
    Move,
}

/// Options for a reorganize run
#[derive(Debug, Clone, Default)]
pub struct ReorganizeOptions {
    pub operation: OperationMode,
}

/// One file the reorganizer will write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub variant: Variant,
    pub original_basename: String,
    pub disambiguated_basename: String,
    /// Path relative to the output root, e.g. `fronts/a_0.jpg`
    pub relative_destination: PathBuf,
}

/// The complete, resolved plan for one run
#[derive(Debug, Clone)]
pub struct ReorganizePlan {
    pub mapping: RenameMapping,
    pub files: Vec<PlannedFile>,
}

impl ReorganizePlan {
    /// Number of identities that received a suffix
    pub fn renamed_count(&self) -> usize {
        self.mapping.renamed_count()
    }
}

/// Result of executing a reorganize run
#[derive(Debug, Clone)]
pub struct ReorganizeResult {
    pub run_id: Uuid,
    pub mapping: RenameMapping,
    pub files_written: usize,
    pub identities: usize,
    pub renamed: usize,
    pub manifest_path: PathBuf,
    /// Non-fatal conditions from indexing and source cleanup
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl ReorganizeResult {
    pub(crate) fn with_scan_warnings(mut self, warnings: &[ScanWarning]) -> Self {
        let mut all: Vec<String> = warnings.iter().map(ToString::to_string).collect();
        all.append(&mut self.warnings);
        self.warnings = all;
        self
    }
}
