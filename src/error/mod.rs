//! # Error Module
//!
//! Error types for the curation pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - every error names the offending path or value
//! - **Stable kinds** - [`CuratorError::kind`] gives the short name printed by the CLI
//! - **Warnings are not errors** - skipped files are collected in stage results

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("Indexing error: {0}")]
    Scan(#[from] ScanError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Fingerprint error: {0}")]
    Hash(#[from] HashError),

    #[error("Deduplication error: {0}")]
    Dedup(#[from] DedupError),

    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("Sidecar error: {0}")]
    Xmp(#[from] XmpError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CuratorError {
    /// Short, stable name of the failure, printed before the message.
    pub fn kind(&self) -> &'static str {
        match self {
            CuratorError::Scan(ScanError::IndexingFailed { .. }) => "IndexingError",
            CuratorError::Scan(_) => "ScanError",
            CuratorError::Output(OutputError::NotEmpty { .. }) => "OutputNotEmptyError",
            CuratorError::Output(OutputError::PartialWrite { .. }) => "PartialWriteError",
            CuratorError::Output(OutputError::Overlapping { .. }) => "OutputOverlapError",
            CuratorError::Output(_) => "OutputError",
            CuratorError::Hash(_) => "FingerprintError",
            CuratorError::Dedup(DedupError::NoPrimaryImage { .. }) => "NoPrimaryImageError",
            CuratorError::Dedup(DedupError::ThresholdOutOfRange { .. }) => {
                "ThresholdOutOfRangeError"
            }
            CuratorError::Dedup(_) => "DedupError",
            CuratorError::Collection(CollectionError::Exists { .. }) => "CollectionExistsError",
            CuratorError::Collection(_) => "CollectionError",
            CuratorError::Xmp(_) => "XmpError",
            CuratorError::Config(_) => "ConfigError",
        }
    }
}

/// Errors raised while indexing an input tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot index {path}: {reason}")]
    IndexingFailed { path: PathBuf, reason: String },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors tied to a stage's output roots
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Output directory {path} exists and is not empty. Provide an empty or new directory.")]
    NotEmpty { path: PathBuf },

    #[error("Write failed at {path}: {reason}. Partial output was removed; rerun the whole stage.")]
    PartialWrite { path: PathBuf, reason: String },

    #[error("Output locations {first} and {second} overlap. Give each its own directory.")]
    Overlapping { first: PathBuf, second: PathBuf },

    #[error("Cannot inspect output location {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while fingerprinting an image
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Fingerprinting {path} exceeded {timeout_ms} ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    #[error("Fingerprint computation failed: {0}")]
    ComputationFailed(String),

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur during deduplication
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Invalid threshold: {value} (must be zero or positive)")]
    ThresholdOutOfRange { value: i64 },

    #[error("Photo '{basename}' has neither a front nor an enhanced front image")]
    NoPrimaryImage { basename: String },

    #[error("Reorganized directory not found: {path}")]
    InputMissing { path: PathBuf },
}

/// Errors that occur while assembling a collection
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Collection version already written: {path}")]
    Exists { path: PathBuf },

    #[error("Collection '{name}' has no unused version left")]
    VersionsExhausted { name: String },

    #[error("Invalid collection name: '{name}'")]
    InvalidName { name: String },

    #[error("Invalid version '{value}' (expected four digits, e.g. 0003)")]
    InvalidVersion { value: String },

    #[error("Source directory not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur reading or writing XMP sidecars
#[derive(Error, Debug)]
pub enum XmpError {
    #[error("Invalid tag key '{key}' (expected prefix:name or name)")]
    InvalidTag { key: String },

    #[error("Malformed sidecar {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to serialize sidecar: {0}")]
    Serialize(String),

    #[error("Sidecar I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading the settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CuratorError>;
