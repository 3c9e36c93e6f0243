//! # Hasher Module
//!
//! Content fingerprints for scanned photos.
//!
//! ## Supported Algorithms
//! - **aHash (Average Hash)** - default; rescans of one print stay within a few bits
//! - **dHash (Difference Hash)** - brightness gradients
//! - **Perceptual** - `image_hasher` double gradient
//! - **Exact** - xxh3 of the file bytes, byte-identical files only
//!
//! ## How It Works
//! 1. Resize image to small size (8x8 by default)
//! 2. Convert to grayscale
//! 3. Compute bits from pixel relationships
//! 4. Compare fingerprints using Hamming distance
//!
//! ## Example
//! ```rust,ignore
//! use photo_curator::core::hasher::{FingerprintKind, HasherConfig};
//!
//! let fingerprinter = HasherConfig::new()
//!     .algorithm(FingerprintKind::Difference)
//!     .hash_size(16)
//!     .build()?;
//!
//! let fingerprint = fingerprinter.fingerprint(&path)?;
//! ```

mod algorithms;
mod timeout;
mod traits;

pub use algorithms::{AverageHasher, DifferenceHasher, ExactHasher, PerceptualHasher};
pub use timeout::fingerprint_with_timeout;
pub use traits::{decode, Fingerprint, FingerprintKind, Fingerprinter};

use crate::error::HashError;
use std::sync::Arc;

/// Configuration builder for fingerprinters
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Grid side length; a fingerprint has `hash_size²` bits
    hash_size: u32,
    algorithm: FingerprintKind,
}

impl HasherConfig {
    pub fn new() -> Self {
        Self {
            hash_size: 8,
            algorithm: FingerprintKind::Average,
        }
    }

    /// Set the grid size.
    ///
    /// - 8: 64 bits, the usual choice
    /// - 16: 256 bits, more discriminating, thresholds scale up accordingly
    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    pub fn algorithm(mut self, algorithm: FingerprintKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Build the fingerprinter
    pub fn build(self) -> Result<Arc<dyn Fingerprinter>, HashError> {
        if self.hash_size == 0 {
            return Err(HashError::ComputationFailed(
                "hash size must be positive".to_string(),
            ));
        }

        match self.algorithm {
            FingerprintKind::Average => Ok(Arc::new(AverageHasher::new(self.hash_size))),
            FingerprintKind::Difference => Ok(Arc::new(DifferenceHasher::new(self.hash_size))),
            FingerprintKind::Perceptual => Ok(Arc::new(PerceptualHasher::new(self.hash_size))),
            FingerprintKind::Exact => Ok(Arc::new(ExactHasher)),
        }
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}
