//! `provenance.json`: where a collection version came from.

use super::version::Version;
use crate::core::output::LinkMode;
use crate::error::OutputError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PROVENANCE_FILE: &str = "provenance.json";
pub const VERSION_FILE: &str = "VERSION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub collection: String,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub source: PathBuf,
    /// Reorganize run the source descends from, if recorded
    pub reorganize_run_id: Option<Uuid>,
    /// Dedup run that produced the source, if it was a dedup output
    pub dedup_run_id: Option<Uuid>,
    pub link_mode: LinkMode,
    /// Seeded tags with normalized keys
    pub tags: BTreeMap<String, String>,
    pub photos: usize,
}

impl Provenance {
    /// Read the provenance of a version directory, if it has one.
    pub fn read(version_dir: &Path) -> Result<Option<Self>, OutputError> {
        let path = version_dir.join(PROVENANCE_FILE);
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
            path: PathBuf::from(PROVENANCE_FILE),
            reason: e.to_string(),
        })
    }
}
