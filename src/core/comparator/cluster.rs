//! Deterministic duplicate clustering.
//!
//! Photos are visited in basename order, so the result does not depend on
//! the order they were listed in. Each one joins the cluster whose
//! representative is nearest (ties go to the older cluster) or starts a
//! new one. Clusters whose representatives are within the threshold are
//! then merged with union-find.

use super::{ComparisonStrategy, DuplicateCluster};
use crate::core::hasher::{Fingerprint, Fingerprinter};
use tracing::debug;

/// Partitions fingerprinted photos into [`DuplicateCluster`]s
pub struct Clusterer<'a> {
    strategy: &'a dyn ComparisonStrategy,
    fingerprinter: &'a dyn Fingerprinter,
}

struct Draft {
    representative: usize,
    members: Vec<usize>,
}

impl<'a> Clusterer<'a> {
    pub fn new(strategy: &'a dyn ComparisonStrategy, fingerprinter: &'a dyn Fingerprinter) -> Self {
        Self {
            strategy,
            fingerprinter,
        }
    }

    /// Cluster `(basename, fingerprint)` pairs.
    ///
    /// A photo without a fingerprint always ends up alone. Every basename
    /// appears in exactly one cluster; clusters come back ordered by their
    /// canonical basename.
    pub fn cluster(&self, photos: &[(String, Option<Fingerprint>)]) -> Vec<DuplicateCluster> {
        let mut order: Vec<usize> = (0..photos.len()).collect();
        order.sort_by(|&a, &b| photos[a].0.cmp(&photos[b].0));

        let distance = |a: usize, b: usize| -> Option<u32> {
            match (&photos[a].1, &photos[b].1) {
                (Some(fa), Some(fb)) => Some(self.fingerprinter.distance(fa, fb)),
                _ => None,
            }
        };

        let mut drafts: Vec<Draft> = Vec::new();
        for &item in &order {
            let nearest = drafts
                .iter()
                .enumerate()
                .filter_map(|(idx, draft)| {
                    distance(draft.representative, item)
                        .filter(|&d| self.strategy.is_duplicate(d))
                        .map(|d| (d, idx))
                })
                .min();

            match nearest {
                Some((_, idx)) => drafts[idx].members.push(item),
                None => drafts.push(Draft {
                    representative: item,
                    members: vec![item],
                }),
            }
        }

        // Representatives never change, so one pass over all pairs is a fixpoint.
        let mut parent: Vec<usize> = (0..drafts.len()).collect();
        for a in 0..drafts.len() {
            for b in (a + 1)..drafts.len() {
                let close = distance(drafts[a].representative, drafts[b].representative)
                    .is_some_and(|d| self.strategy.is_duplicate(d));
                if close {
                    union(&mut parent, a, b);
                }
            }
        }

        let mut merged: Vec<Vec<usize>> = vec![Vec::new(); drafts.len()];
        for (idx, draft) in drafts.iter().enumerate() {
            let root = find(&mut parent, idx);
            merged[root].extend(draft.members.iter().copied());
        }

        let mut clusters: Vec<DuplicateCluster> = merged
            .into_iter()
            .filter(|members| !members.is_empty())
            .map(|mut members| {
                members.sort_by(|&a, &b| photos[a].0.cmp(&photos[b].0));
                let canonical = members[0];
                let max_distance = members[1..]
                    .iter()
                    .filter_map(|&m| distance(canonical, m))
                    .max()
                    .unwrap_or(0);
                let duplicates: Vec<String> =
                    members[1..].iter().map(|&m| photos[m].0.clone()).collect();
                let match_type =
                    (!duplicates.is_empty()).then(|| self.strategy.classify(max_distance));

                DuplicateCluster {
                    canonical: photos[canonical].0.clone(),
                    duplicates,
                    max_distance,
                    match_type,
                }
            })
            .collect();
        clusters.sort_by(|a, b| a.canonical.cmp(&b.canonical));

        debug!(
            photos = photos.len(),
            clusters = clusters.len(),
            threshold = self.strategy.threshold(),
            "clustering complete"
        );
        clusters
    }
}

fn find(parent: &mut [usize], x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    let mut node = x;
    while parent[node] != root {
        let next = parent[node];
        parent[node] = root;
        node = next;
    }
    root
}

/// Union keeping the lower index as root
fn union(parent: &mut [usize], a: usize, b: usize) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        let (keep, absorb) = (root_a.min(root_b), root_a.max(root_b));
        parent[absorb] = keep;
    }
}
