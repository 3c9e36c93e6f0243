//! Byte-level fingerprint: xxh3-128 of the file contents.

use super::super::traits::{Fingerprint, FingerprintKind, Fingerprinter};
use crate::error::HashError;
use image::DynamicImage;
use std::fs;
use std::path::Path;
use xxhash_rust::xxh3::xxh3_128;

/// Matches byte-identical files only
pub struct ExactHasher;

impl Fingerprinter for ExactHasher {
    fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let digest = xxh3_128(image.as_bytes());
        Ok(Fingerprint::new(digest.to_be_bytes().to_vec(), FingerprintKind::Exact))
    }

    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let bytes = fs::read(path).map_err(|source| HashError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(HashError::EmptyImage {
                path: path.to_path_buf(),
            });
        }
        Ok(Fingerprint::new(
            xxh3_128(&bytes).to_be_bytes().to_vec(),
            FingerprintKind::Exact,
        ))
    }

    fn distance(&self, a: &Fingerprint, b: &Fingerprint) -> u32 {
        if a == b {
            0
        } else {
            u32::MAX
        }
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Exact
    }
}
