//! # Core Module
//!
//! The pipeline stages, independent of any user interface.
//!
//! ## Modules
//! - `scanner` - Indexes raw scanner output and category trees
//! - `reorganize` - Copies scans into `fronts/`, `enhanced_fronts/`, `backs/`
//! - `hasher` - Computes content fingerprints
//! - `comparator` - Clusters near-duplicate photos
//! - `dedup` - Splits a reorganized tree into kept photos and duplicates
//! - `collection` - Builds versioned, tag-seeded collections
//! - `xmp` - Reads and writes `.xmp` sidecars
//! - `output` - Output ownership and rollback shared by the stages

pub mod collection;
pub mod comparator;
pub mod dedup;
pub mod hasher;
pub mod output;
pub mod reorganize;
pub mod scanner;
pub mod xmp;

// Re-export commonly used types
pub use collection::{CollectionBuilder, InitOptions, Version};
pub use comparator::{DuplicateCluster, MatchType};
pub use dedup::{DedupOptions, Deduplicator};
pub use hasher::{Fingerprint, FingerprintKind};
pub use reorganize::{Reorganizer, ReorganizeOptions};
pub use scanner::{ScanConfig, ScanIndex, ScanIndexer, Variant};
