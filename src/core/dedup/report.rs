//! `dedup_report.json`: what was kept and why.

use crate::core::comparator::DuplicateCluster;
use crate::core::hasher::FingerprintKind;
use crate::error::OutputError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEDUP_REPORT_FILE: &str = "dedup_report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupReport {
    pub run_id: Uuid,
    /// Run id from the input tree's `manifest.json`, when it has one
    pub source_run_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub input_root: PathBuf,
    pub threshold: u32,
    pub algorithm: FingerprintKind,
    pub hash_size: u32,
    pub identities: usize,
    pub kept: usize,
    pub duplicates: usize,
    pub clusters: Vec<DuplicateCluster>,
    pub warnings: Vec<String>,
}

impl DedupReport {
    /// Read the report of a deduplicated tree, if it has one.
    pub fn read(dir: &Path) -> Result<Option<Self>, OutputError> {
        let path = dir.join(DEDUP_REPORT_FILE);
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
            path: PathBuf::from(DEDUP_REPORT_FILE),
            reason: e.to_string(),
        })
    }
}
