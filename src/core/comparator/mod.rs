//! # Comparator Module
//!
//! Partitions fingerprinted photos into duplicate clusters.
//!
//! ## How It Works
//! 1. Visit photos in basename order, joining the nearest cluster whose
//!    representative is within the threshold
//! 2. Merge clusters whose representatives are within the threshold
//! 3. The lowest basename of each cluster is kept, the rest are duplicates
//!
//! ## Comparison Thresholds (8x8 fingerprints)
//! | Distance | Classification |
//! |----------|---------------|
//! | 0        | Exact match   |
//! | 1-4      | Near-exact    |
//! | 5-10     | Similar       |
//! | 11+      | Different     |

mod cluster;
mod traits;

pub use cluster::Clusterer;
pub use traits::{ComparisonStrategy, ThresholdStrategy};

use serde::{Deserialize, Serialize};

/// Classification of match types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Distance = 0
    Exact,
    /// Distance 1-4
    NearExact,
    /// Distance 5-10
    Similar,
    /// Distance 11 and up
    MaybeSimilar,
}

impl MatchType {
    pub fn from_distance(distance: u32) -> Self {
        match distance {
            0 => MatchType::Exact,
            1..=4 => MatchType::NearExact,
            5..=10 => MatchType::Similar,
            _ => MatchType::MaybeSimilar,
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "Exact Match"),
            MatchType::NearExact => write!(f, "Near-Exact Match"),
            MatchType::Similar => write!(f, "Similar"),
            MatchType::MaybeSimilar => write!(f, "Possibly Similar"),
        }
    }
}

/// One cluster of the partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    /// Lowest basename of the cluster; this one is kept
    pub canonical: String,
    /// Remaining members, sorted
    pub duplicates: Vec<String>,
    /// Largest distance from the canonical to any duplicate
    pub max_distance: u32,
    /// `None` for singletons
    pub match_type: Option<MatchType>,
}

impl DuplicateCluster {
    /// Canonical first, then the duplicates
    pub fn members(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str()).chain(self.duplicates.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        1 + self.duplicates.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.duplicates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_from_distance() {
        assert_eq!(MatchType::from_distance(0), MatchType::Exact);
        assert_eq!(MatchType::from_distance(3), MatchType::NearExact);
        assert_eq!(MatchType::from_distance(7), MatchType::Similar);
        assert_eq!(MatchType::from_distance(15), MatchType::MaybeSimilar);
    }

    #[test]
    fn members_start_with_canonical() {
        let cluster = DuplicateCluster {
            canonical: "a".to_string(),
            duplicates: vec!["b".to_string(), "c".to_string()],
            max_distance: 2,
            match_type: Some(MatchType::NearExact),
        };

        assert_eq!(cluster.members().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(cluster.len(), 3);
        assert!(!cluster.is_singleton());
    }
}
