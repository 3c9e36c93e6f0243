//! `manifest.json`: audit record of a reorganize run.

use super::PlannedFile;
use crate::core::scanner::Variant;
use crate::error::OutputError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "manifest.json";

/// One output file and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub disambiguated_basename: String,
    pub original_basename: String,
    pub variant: Variant,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorganizeManifest {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input_root: PathBuf,
    pub entries: Vec<ManifestEntry>,
}

impl ReorganizeManifest {
    pub(crate) fn new(run_id: Uuid, input_root: &Path, output_root: &Path, files: &[PlannedFile]) -> Self {
        let entries = files
            .iter()
            .map(|file| ManifestEntry {
                disambiguated_basename: file.disambiguated_basename.clone(),
                original_basename: file.original_basename.clone(),
                variant: file.variant,
                source_path: file.source.clone(),
                dest_path: output_root.join(&file.relative_destination),
            })
            .collect();

        Self {
            run_id,
            created_at: Utc::now(),
            input_root: input_root.to_path_buf(),
            entries,
        }
    }

    /// Read the manifest of a reorganized tree, if it has one.
    pub fn read(dir: &Path) -> Result<Option<Self>, OutputError> {
        let path = dir.join(MANIFEST_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(OutputError::Inspect { path, source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| OutputError::Inspect {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })
    }

    pub(crate) fn to_json(&self) -> Result<Vec<u8>, OutputError> {
        serde_json::to_vec_pretty(self).map_err(|e| OutputError::PartialWrite {
            path: PathBuf::from(MANIFEST_FILE),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_manifest_reads_as_none() {
        let temp = TempDir::new().unwrap();
        assert!(ReorganizeManifest::read(temp.path()).unwrap().is_none());
    }

    #[test]
    fn written_manifest_reads_back() {
        let temp = TempDir::new().unwrap();
        let files = vec![PlannedFile {
            source: PathBuf::from("/scans/x/a_b.jpg"),
            variant: Variant::Back,
            original_basename: "a".to_string(),
            disambiguated_basename: "a_0".to_string(),
            relative_destination: PathBuf::from("backs/a_0.jpg"),
        }];
        let manifest = ReorganizeManifest::new(Uuid::new_v4(), Path::new("/scans"), temp.path(), &files);
        fs::write(temp.path().join(MANIFEST_FILE), manifest.to_json().unwrap()).unwrap();

        let read = ReorganizeManifest::read(temp.path()).unwrap().unwrap();
        assert_eq!(read.run_id, manifest.run_id);
        assert_eq!(read.entries[0].dest_path, temp.path().join("backs/a_0.jpg"));
        assert_eq!(read.entries[0].variant, Variant::Back);
    }

    #[test]
    fn garbage_manifest_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MANIFEST_FILE), b"not json").unwrap();
        assert!(ReorganizeManifest::read(temp.path()).is_err());
    }
}
