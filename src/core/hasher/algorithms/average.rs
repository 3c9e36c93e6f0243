//! Average Hash (aHash) implementation.
//!
//! aHash works by:
//! 1. Resizing the image to hash_size x hash_size
//! 2. Converting to grayscale
//! 3. Computing the mean brightness
//! 4. For each pixel: if brighter than the mean, set bit to 1, else 0
//!
//! Rescans of the same print land within a few bits of each other.

use super::super::traits::{pack_bits, Fingerprint, FingerprintKind, Fingerprinter};
use crate::error::HashError;
use image::imageops::FilterType;
use image::DynamicImage;

/// Average Hash (aHash) implementation
pub struct AverageHasher {
    hash_size: u32,
}

impl AverageHasher {
    pub fn new(hash_size: u32) -> Self {
        Self { hash_size }
    }
}

impl Fingerprinter for AverageHasher {
    fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let gray = image
            .resize_exact(self.hash_size, self.hash_size, FilterType::Lanczos3)
            .to_luma8();

        let count = u64::from(self.hash_size) * u64::from(self.hash_size);
        if count == 0 {
            return Err(HashError::ComputationFailed("hash size must be positive".to_string()));
        }
        let total: u64 = gray.pixels().map(|p| u64::from(p[0])).sum();
        let mean = total as f64 / count as f64;

        let bytes = pack_bits(gray.pixels().map(|p| f64::from(p[0]) > mean));
        Ok(Fingerprint::new(bytes, FingerprintKind::Average))
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Average
    }
}
