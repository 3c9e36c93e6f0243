//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to (hash_size+1) x hash_size
//! 2. Converting to grayscale
//! 3. Comparing each pixel to the one to its right
//! 4. If left pixel is brighter, set bit to 1, else 0

use super::super::traits::{pack_bits, Fingerprint, FingerprintKind, Fingerprinter};
use crate::error::HashError;
use image::imageops::FilterType;
use image::DynamicImage;

/// Difference Hash (dHash) implementation
pub struct DifferenceHasher {
    hash_size: u32,
}

impl DifferenceHasher {
    pub fn new(hash_size: u32) -> Self {
        Self { hash_size }
    }
}

impl Fingerprinter for DifferenceHasher {
    fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        // One extra column to compute differences
        let gray = image
            .resize_exact(self.hash_size + 1, self.hash_size, FilterType::Triangle)
            .to_luma8();

        let size = self.hash_size;
        let bits = (0..size).flat_map(|y| {
            let gray = &gray;
            (0..size).map(move |x| gray.get_pixel(x, y)[0] > gray.get_pixel(x + 1, y)[0])
        });

        Ok(Fingerprint::new(pack_bits(bits), FingerprintKind::Difference))
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Difference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient(reverse: bool) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(90, 80, |x, _| {
            let v = (x * 255 / 89) as u8;
            let v = if reverse { 255 - v } else { v };
            Rgb([v, v, v])
        }))
    }

    #[test]
    fn produces_hash_size_squared_bits() {
        let fingerprint = DifferenceHasher::new(8).fingerprint_image(&gradient(false)).unwrap();
        assert_eq!(fingerprint.as_bytes().len(), 8);
        assert_eq!(fingerprint.algorithm(), FingerprintKind::Difference);
    }

    #[test]
    fn opposite_gradients_are_far_apart() {
        let hasher = DifferenceHasher::new(8);
        let a = hasher.fingerprint_image(&gradient(false)).unwrap();
        let b = hasher.fingerprint_image(&gradient(true)).unwrap();
        assert!(hasher.distance(&a, &b) > 32);
    }

    #[test]
    fn same_image_is_distance_zero() {
        let hasher = DifferenceHasher::new(8);
        let a = hasher.fingerprint_image(&gradient(true)).unwrap();
        let b = hasher.fingerprint_image(&gradient(true)).unwrap();
        assert_eq!(hasher.distance(&a, &b), 0);
    }
}
