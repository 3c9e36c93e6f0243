//! Trait definitions for image fingerprinting.

use crate::error::HashError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Available fingerprint algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintKind {
    /// Average Hash (aHash)
    #[default]
    Average,
    /// Difference Hash (dHash)
    Difference,
    /// Gradient hash from `image_hasher`
    Perceptual,
    /// Digest of the file bytes
    Exact,
}

impl FingerprintKind {
    /// One-line explanation shown next to dedup results
    pub fn description(&self) -> &'static str {
        match self {
            FingerprintKind::Average => {
                "Average Hash (aHash) - pixels brighter than the mean brightness"
            }
            FingerprintKind::Difference => {
                "Difference Hash (dHash) - brightness gradients between neighbouring pixels"
            }
            FingerprintKind::Perceptual => {
                "Perceptual Hash - double gradient, robust to rescans and slight edits"
            }
            FingerprintKind::Exact => "Exact - byte-identical files only",
        }
    }
}

impl std::fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintKind::Average => write!(f, "average"),
            FingerprintKind::Difference => write!(f, "difference"),
            FingerprintKind::Perceptual => write!(f, "perceptual"),
            FingerprintKind::Exact => write!(f, "exact"),
        }
    }
}

/// Content signature of one image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    bytes: Vec<u8>,
    algorithm: FingerprintKind,
}

impl Fingerprint {
    pub fn new(bytes: Vec<u8>, algorithm: FingerprintKind) -> Self {
        Self { bytes, algorithm }
    }

    pub fn algorithm(&self) -> FingerprintKind {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of differing bits.
    ///
    /// Fingerprints of different algorithms or lengths are never close:
    /// the distance is `u32::MAX`.
    pub fn hamming(&self, other: &Fingerprint) -> u32 {
        if self.algorithm != other.algorithm || self.bytes.len() != other.bytes.len() {
            return u32::MAX;
        }
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// Trait for fingerprint implementations
pub trait Fingerprinter: Send + Sync {
    /// Fingerprint an already-decoded image
    fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint, HashError>;

    /// Fingerprint a file
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let image = decode(path)?;
        self.fingerprint_image(&image)
    }

    /// Distance between two fingerprints; 0 means indistinguishable
    fn distance(&self, a: &Fingerprint, b: &Fingerprint) -> u32 {
        a.hamming(b)
    }

    fn kind(&self) -> FingerprintKind;
}

/// Decode an image file, rejecting zero-sized images.
pub fn decode(path: &Path) -> Result<DynamicImage, HashError> {
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(source) => HashError::IoError {
            path: path.to_path_buf(),
            source,
        },
        other => HashError::DecodeError {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(HashError::EmptyImage {
            path: path.to_path_buf(),
        });
    }
    Ok(image)
}

/// Pack row-major bits, most significant bit first.
pub(crate) fn pack_bits(bits: impl Iterator<Item = bool>) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut current: u8 = 0;
    let mut position = 0;

    for bit in bits {
        if bit {
            current |= 1 << (7 - position);
        }
        position += 1;
        if position == 8 {
            bytes.push(current);
            current = 0;
            position = 0;
        }
    }
    if position > 0 {
        bytes.push(current);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(bytes: &[u8]) -> Fingerprint {
        Fingerprint::new(bytes.to_vec(), FingerprintKind::Average)
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = fingerprint(&[0xFF, 0x00, 0xAA, 0x55]);
        assert_eq!(a.hamming(&a), 0);
    }

    #[test]
    fn distance_counts_differing_bits() {
        assert_eq!(fingerprint(&[0b1111_1111]).hamming(&fingerprint(&[0])), 8);
        assert_eq!(fingerprint(&[0b1010_0000]).hamming(&fingerprint(&[0])), 2);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = fingerprint(&[0xFF, 0x00]);
        let b = fingerprint(&[0x0F, 0xF0]);
        assert_eq!(a.hamming(&b), b.hamming(&a));
    }

    #[test]
    fn mismatched_fingerprints_are_far_apart() {
        let average = fingerprint(&[0xFF]);
        let difference = Fingerprint::new(vec![0xFF], FingerprintKind::Difference);
        assert_eq!(average.hamming(&difference), u32::MAX);
        assert_eq!(average.hamming(&fingerprint(&[0xFF, 0xFF])), u32::MAX);
    }

    #[test]
    fn pack_bits_fills_msb_first() {
        let bits = [true, false, false, false, false, false, false, true, true];
        assert_eq!(pack_bits(bits.into_iter()), vec![0b1000_0001, 0b1000_0000]);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FingerprintKind::Perceptual).unwrap(), "\"perceptual\"");
        assert_eq!(FingerprintKind::default(), FingerprintKind::Average);
        assert_eq!(FingerprintKind::Exact.to_string(), "exact");
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = decode(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(HashError::IoError { .. })));
    }
}
