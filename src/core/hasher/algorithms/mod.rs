//! Fingerprint algorithm implementations.

mod average;
mod difference;
mod exact;
mod perceptual;

pub use average::AverageHasher;
pub use difference::DifferenceHasher;
pub use exact::ExactHasher;
pub use perceptual::PerceptualHasher;
