//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the pipeline stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Input tree indexing
    Scan(ScanEvent),
    /// Fingerprint computation during dedup
    Fingerprint(FingerprintEvent),
    /// File copies performed by any stage
    Copy(CopyEvent),
    /// Stage-level events
    Stage(StageEvent),
}

/// Events during indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Indexing has started
    Started { root: PathBuf },
    /// Progress update while walking
    Progress(ScanProgress),
    /// A path was skipped but indexing continues
    Skipped { path: PathBuf, message: String },
    /// Indexing completed
    Completed { total_files: usize, identities: usize },
}

/// Progress information during indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories visited so far
    pub directories_scanned: usize,
    /// Number of image files indexed so far
    pub files_found: usize,
    /// Directory currently being visited
    pub current_path: PathBuf,
}

/// Events during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FingerprintEvent {
    /// Fingerprinting has started
    Started { total: usize },
    /// One identity was fingerprinted
    Progress(FingerprintProgress),
    /// Fingerprinting failed for one image; it is kept as its own cluster
    Failed { path: PathBuf, message: String },
    /// Fingerprinting completed
    Completed { fingerprinted: usize, failures: usize },
}

/// Progress information during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    pub completed: usize,
    pub total: usize,
    pub current_path: PathBuf,
}

/// Events while a stage materializes files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CopyEvent {
    /// Copying has started
    Started { total: usize },
    /// Progress update
    Progress(CopyProgress),
    /// All copies succeeded
    Completed { copied: usize },
}

/// Progress information while copying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyProgress {
    pub completed: usize,
    pub total: usize,
    pub current_path: PathBuf,
}

/// Stage-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    /// A stage has started
    Started { stage: Stage },
    /// A stage finished and its output is committed
    Completed { stage: Stage, summary: StageSummary },
    /// A stage failed; its partial output has been removed
    Failed { stage: Stage, kind: String, message: String },
}

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Indexing,
    Reorganizing,
    Deduplicating,
    Collecting,
}

/// Summary of a finished stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    /// Files written by the stage
    pub files_written: usize,
    /// Non-fatal warnings collected during the stage
    pub warnings: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Indexing => write!(f, "Indexing"),
            Stage::Reorganizing => write!(f, "Reorganizing"),
            Stage::Deduplicating => write!(f, "Deduplicating"),
            Stage::Collecting => write!(f, "Collecting"),
        }
    }
}
