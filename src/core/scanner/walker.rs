//! Directory walking implementation using walkdir.

use super::{classify::VariantClassifier, filter::ImageFilter, ScanEntry, ScanIndex, ScanWarning, Variant};
use crate::error::ScanError;
use crate::events::{
    null_sender, Event, EventSender, ScanEvent, ScanProgress, Stage, StageEvent, StageSummary,
};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for the indexer
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
    /// Filename convention of the scanning device
    pub classifier: VariantClassifier,
}

impl ScanConfig {
    /// The file filter this configuration describes
    pub fn filter(&self) -> ImageFilter {
        let filter = ImageFilter::new().with_hidden(self.include_hidden);
        match self.extensions {
            Some(ref extensions) => filter.with_extensions(extensions.clone()),
            None => filter,
        }
    }
}

/// Walks an input tree and classifies every image file
pub struct ScanIndexer {
    config: ScanConfig,
    filter: ImageFilter,
}

impl ScanIndexer {
    /// Create a new indexer with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let filter = config.filter();
        Self { config, filter }
    }

    /// Index `root` without progress reporting
    pub fn index(&self, root: &Path) -> Result<ScanIndex, ScanError> {
        self.index_with_events(root, &null_sender())
    }

    /// Index `root`, reporting progress and skipped paths as events.
    ///
    /// Fails only when the root itself cannot be read; anything below it
    /// that cannot be read lands in [`ScanIndex::warnings`].
    pub fn index_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ScanIndex, ScanError> {
        let start = Instant::now();
        events.send(Event::Stage(StageEvent::Started {
            stage: Stage::Indexing,
        }));

        match self.walk(root, events) {
            Ok(index) => {
                events.send(Event::Stage(StageEvent::Completed {
                    stage: Stage::Indexing,
                    summary: StageSummary {
                        files_written: 0,
                        warnings: index.warnings.len(),
                        duration_ms: start.elapsed().as_millis() as u64,
                    },
                }));
                Ok(index)
            }
            Err(e) => {
                let kind = match e {
                    ScanError::IndexingFailed { .. } => "IndexingError",
                    _ => "ScanError",
                };
                events.send(Event::Stage(StageEvent::Failed {
                    stage: Stage::Indexing,
                    kind: kind.to_string(),
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    fn walk(&self, root: &Path, events: &EventSender) -> Result<ScanIndex, ScanError> {
        let root = check_root(root)?;
        info!(root = %root.display(), "indexing scan tree");
        events.send(Event::Scan(ScanEvent::Started { root: root.clone() }));

        let mut entries: Vec<ScanEntry> = Vec::new();
        let mut warnings = Vec::new();
        let mut slots: HashMap<(PathBuf, String, Variant), PathBuf> = HashMap::new();
        let mut directories_scanned = 0;

        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.filter.is_excluded_hidden(e.path()));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    let error = match e.io_error().map(|io| io.kind()) {
                        Some(ErrorKind::PermissionDenied) => {
                            ScanError::PermissionDenied { path: path.clone() }
                        }
                        _ => ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        },
                    };
                    warn!(path = %path.display(), error = %error, "skipping unreadable path");
                    events.send(Event::Scan(ScanEvent::Skipped {
                        path: path.clone(),
                        message: error.to_string(),
                    }));
                    warnings.push(ScanWarning::Unreadable {
                        path,
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            let path = entry.path();

            if entry.file_type().is_dir() {
                directories_scanned += 1;
                events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned,
                    files_found: entries.len(),
                    current_path: path.to_path_buf(),
                })));
                continue;
            }

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(extension) = self.filter.image_extension(path) else {
                debug!(path = %path.display(), "not an image");
                warnings.push(ScanWarning::UnrecognizedExtension {
                    path: path.to_path_buf(),
                });
                continue;
            };

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                warnings.push(ScanWarning::Unreadable {
                    path: path.to_path_buf(),
                    reason: "file name is not valid UTF-8".to_string(),
                });
                continue;
            };

            let (basename, variant) = self.config.classifier.classify(stem);
            let origin = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.clone());

            let slot = (origin.clone(), basename.clone(), variant);
            if let Some(kept) = slots.get(&slot) {
                warn!(
                    path = %path.display(),
                    kept = %kept.display(),
                    "second file for the same photo and variant"
                );
                warnings.push(ScanWarning::DuplicateVariant {
                    path: path.to_path_buf(),
                    kept: kept.clone(),
                });
                continue;
            }
            slots.insert(slot, path.to_path_buf());

            entries.push(ScanEntry {
                source_path: path.to_path_buf(),
                basename,
                variant,
                extension,
                origin,
                discovery_index: entries.len(),
            });
        }

        let index = ScanIndex {
            root,
            entries,
            warnings,
        };

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: index.entries.len(),
            identities: index.identity_count(),
        }));
        info!(
            files = index.entries.len(),
            identities = index.identity_count(),
            warnings = index.warnings.len(),
            "indexing complete"
        );

        Ok(index)
    }
}

/// The root must exist, be a directory and be listable.
fn check_root(root: &Path) -> Result<PathBuf, ScanError> {
    let failed = |reason: String| ScanError::IndexingFailed {
        path: root.to_path_buf(),
        reason,
    };

    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        ErrorKind::NotFound => failed("directory does not exist".to_string()),
        _ => failed(e.to_string()),
    })?;

    if !metadata.is_dir() {
        return Err(failed("not a directory".to_string()));
    }

    fs::read_dir(root).map_err(|e| failed(format!("directory is not readable: {e}")))?;
    fs::canonicalize(root).map_err(|e| failed(e.to_string()))
}
