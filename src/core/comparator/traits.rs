//! Trait definitions for comparison strategies.

use super::MatchType;

/// Strategy trait for deciding whether two photos are duplicates
pub trait ComparisonStrategy: Send + Sync {
    /// Determine if two photos should be considered duplicates based on distance
    fn is_duplicate(&self, distance: u32) -> bool;

    /// Classify the match type based on distance
    fn classify(&self, distance: u32) -> MatchType;

    fn threshold(&self) -> u32;
}

/// Inclusive distance threshold
#[derive(Debug, Clone)]
pub struct ThresholdStrategy {
    threshold: u32,
}

impl ThresholdStrategy {
    /// Create a new threshold strategy
    ///
    /// With 8x8 fingerprints:
    /// - 0: identical fingerprints only
    /// - 5: rescans of the same print (default)
    /// - 10: permissive, starts catching different prints of one scene
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ComparisonStrategy for ThresholdStrategy {
    fn is_duplicate(&self, distance: u32) -> bool {
        distance <= self.threshold
    }

    fn classify(&self, distance: u32) -> MatchType {
        MatchType::from_distance(distance)
    }

    fn threshold(&self) -> u32 {
        self.threshold
    }
}
