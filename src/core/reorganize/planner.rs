//! Collision-safe rename planning.

use super::{PlannedFile, ReorganizePlan};
use crate::core::scanner::{IdentityKey, ScanIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Disambiguated basename for every identity of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameMapping {
    names: BTreeMap<IdentityKey, String>,
}

impl RenameMapping {
    /// Build the mapping for an index.
    ///
    /// Basenames found in one directory keep their name. Basenames found
    /// in several directories get `_0`, `_1`, ... ordered by directory
    /// path, then by first discovery. A generated name that is already
    /// some other photo's name is skipped.
    pub fn build(index: &ScanIndex) -> Self {
        let mut names = BTreeMap::new();
        let mut taken: HashSet<String> = HashSet::new();
        let mut colliding: Vec<(String, Vec<IdentityKey>)> = Vec::new();

        for group in index.groups() {
            let mut identities: BTreeMap<IdentityKey, usize> = BTreeMap::new();
            for entry in &group.entries {
                let first_seen = identities.entry(entry.identity()).or_insert(entry.discovery_index);
                *first_seen = (*first_seen).min(entry.discovery_index);
            }

            if !group.is_collision() {
                taken.insert(group.basename.clone());
                for key in identities.into_keys() {
                    names.insert(key, group.basename.clone());
                }
                continue;
            }

            let mut ordered: Vec<(IdentityKey, usize)> = identities.into_iter().collect();
            ordered.sort_by(|(a, a_seen), (b, b_seen)| {
                a.origin
                    .to_string_lossy()
                    .cmp(&b.origin.to_string_lossy())
                    .then(a_seen.cmp(b_seen))
            });
            colliding.push((
                group.basename.clone(),
                ordered.into_iter().map(|(key, _)| key).collect(),
            ));
        }

        for (basename, identities) in colliding {
            let mut counter = 0usize;
            for key in identities {
                let name = loop {
                    let candidate = format!("{basename}_{counter}");
                    counter += 1;
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                };
                taken.insert(name.clone());
                names.insert(key, name);
            }
        }

        Self { names }
    }

    /// Disambiguated basename of an identity
    pub fn get(&self, key: &IdentityKey) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// Iterate `(identity, disambiguated basename)` in identity order
    pub fn iter(&self) -> impl Iterator<Item = (&IdentityKey, &str)> {
        self.names.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Identities whose name differs from their basename
    pub fn renamed_count(&self) -> usize {
        self.names.iter().filter(|(k, v)| k.basename != **v).count()
    }
}

/// Turns an index into a [`ReorganizePlan`]. Pure; touches no files.
pub struct RenamePlanner;

impl RenamePlanner {
    pub fn plan(index: &ScanIndex) -> ReorganizePlan {
        let mapping = RenameMapping::build(index);

        let mut files: Vec<PlannedFile> = index
            .entries
            .iter()
            .filter_map(|entry| {
                let name = mapping.get(&entry.identity())?;
                Some(PlannedFile {
                    source: entry.source_path.clone(),
                    variant: entry.variant,
                    original_basename: entry.basename.clone(),
                    disambiguated_basename: name.to_string(),
                    relative_destination: PathBuf::from(entry.variant.category_dir())
                        .join(format!("{}.{}", name, entry.extension)),
                })
            })
            .collect();
        files.sort_by(|a, b| a.relative_destination.cmp(&b.relative_destination));

        ReorganizePlan { mapping, files }
    }
}
