//! Perceptual hash backed by the `image_hasher` crate.
//!
//! Uses the double gradient algorithm, which tolerates rescans at a
//! different resolution, slight brightness changes and compression
//! artifacts better than aHash.

use super::super::traits::{Fingerprint, FingerprintKind, Fingerprinter};
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig as ImageHasherConfig};

pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    pub fn new(hash_size: u32) -> Self {
        let hasher = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::DoubleGradient)
            .to_hasher();

        Self { hasher }
    }
}

impl Fingerprinter for PerceptualHasher {
    fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let hash = self.hasher.hash_image(image);
        Ok(Fingerprint::new(hash.as_bytes().to_vec(), FingerprintKind::Perceptual))
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Perceptual
    }
}
