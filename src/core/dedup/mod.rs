//! # Dedup Module
//!
//! Splits a reorganized tree into kept photos and near duplicates.
//!
//! ## Stages
//! 1. **Discover** - identities are the file stems of the three category dirs
//! 2. **Fingerprint** - the front (or enhanced front) of each identity, in parallel
//! 3. **Cluster** - see [`Clusterer`]
//! 4. **Copy** - canonical identities to `output/`, the rest to `duplicates/`,
//!    every variant file of an identity travelling together
//! 5. **Report** - `dedup_report.json` in the output root
//!
//! The reorganized tree is only read.

mod report;

pub use report::{DedupReport, DEDUP_REPORT_FILE};

use crate::core::comparator::{Clusterer, DuplicateCluster, ThresholdStrategy};
use crate::core::hasher::{
    fingerprint_with_timeout, Fingerprint, FingerprintKind, Fingerprinter, HasherConfig,
};
use crate::core::output::{
    ensure_disjoint, ensure_vacant, execute_copies, write_guarded, CopyJob, LinkMode, RunGuard,
};
use crate::core::reorganize::ReorganizeManifest;
use crate::core::scanner::{CategoryTree, ImageFilter};
use crate::error::{CuratorError, DedupError};
use crate::events::{
    Event, EventSender, FingerprintEvent, FingerprintProgress, Stage, StageEvent, StageSummary,
};
use chrono::Utc;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Settings for a dedup run
#[derive(Debug, Clone)]
pub struct DedupOptions {
    /// Maximum distance for two photos to count as duplicates; must not be negative
    pub threshold: i64,
    pub algorithm: FingerprintKind,
    pub hash_size: u32,
    pub fingerprint_timeout: Duration,
    pub filter: ImageFilter,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            threshold: 5,
            algorithm: FingerprintKind::Average,
            hash_size: 8,
            fingerprint_timeout: Duration::from_secs(30),
            filter: ImageFilter::new(),
        }
    }
}

impl DedupOptions {
    pub fn threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn algorithm(mut self, algorithm: FingerprintKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn hash_size(mut self, hash_size: u32) -> Self {
        self.hash_size = hash_size;
        self
    }

    pub fn fingerprint_timeout(mut self, timeout: Duration) -> Self {
        self.fingerprint_timeout = timeout;
        self
    }

    pub fn filter(mut self, filter: ImageFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Negative thresholds are refused; anything past `u32::MAX` already
    /// matches every pair and saturates.
    fn checked_threshold(&self) -> Result<u32, DedupError> {
        if self.threshold < 0 {
            return Err(DedupError::ThresholdOutOfRange {
                value: self.threshold,
            });
        }
        Ok(u32::try_from(self.threshold).unwrap_or(u32::MAX))
    }
}

/// Result of a dedup run
#[derive(Debug, Clone)]
pub struct DedupResult {
    pub run_id: Uuid,
    pub identities: usize,
    pub kept: usize,
    pub duplicates: usize,
    pub clusters: Vec<DuplicateCluster>,
    pub files_written: usize,
    pub report_path: PathBuf,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

pub struct Deduplicator {
    options: DedupOptions,
}

/// Everything learned from the input before any output is written
struct Analysis {
    threshold: u32,
    tree: CategoryTree,
    identities: usize,
    clusters: Vec<DuplicateCluster>,
    warnings: Vec<String>,
}

/// The two roots of a run and whether each existed (empty) beforehand
struct Roots<'a> {
    output: &'a Path,
    output_existed: bool,
    duplicates: &'a Path,
    duplicates_existed: bool,
}

impl Deduplicator {
    pub fn new(options: DedupOptions) -> Self {
        Self { options }
    }

    /// Run the stage.
    ///
    /// `output` and `duplicates` must each be absent or empty. Nothing is
    /// written before every identity is known to have a primary image;
    /// a failure after that removes both roots again.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        duplicates: &Path,
        events: &EventSender,
    ) -> Result<DedupResult, CuratorError> {
        events.send(Event::Stage(StageEvent::Started {
            stage: Stage::Deduplicating,
        }));

        match self.execute(input, output, duplicates, events) {
            Ok(result) => {
                events.send(Event::Stage(StageEvent::Completed {
                    stage: Stage::Deduplicating,
                    summary: StageSummary {
                        files_written: result.files_written,
                        warnings: result.warnings.len(),
                        duration_ms: result.duration_ms,
                    },
                }));
                Ok(result)
            }
            Err(e) => {
                events.send(Event::Stage(StageEvent::Failed {
                    stage: Stage::Deduplicating,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        input: &Path,
        output: &Path,
        duplicates: &Path,
        events: &EventSender,
    ) -> Result<DedupResult, CuratorError> {
        let start = Instant::now();
        let threshold = self.options.checked_threshold()?;
        let run_id = Uuid::new_v4();
        let _span = info_span!("dedup", %run_id, threshold).entered();

        if !input.is_dir() {
            return Err(DedupError::InputMissing {
                path: input.to_path_buf(),
            }
            .into());
        }
        ensure_disjoint(output, duplicates)?;
        let roots = Roots {
            output,
            output_existed: ensure_vacant(output)?,
            duplicates,
            duplicates_existed: ensure_vacant(duplicates)?,
        };

        let analysis = self.analyze(input, threshold, events)?;
        let (report, files_written) = self.write(run_id, input, &roots, analysis, events)?;

        Ok(DedupResult {
            run_id,
            identities: report.identities,
            kept: report.kept,
            duplicates: report.duplicates,
            clusters: report.clusters,
            files_written,
            report_path: output.join(DEDUP_REPORT_FILE),
            warnings: report.warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Discover, fingerprint and cluster. Reads `input` only.
    fn analyze(
        &self,
        input: &Path,
        threshold: u32,
        events: &EventSender,
    ) -> Result<Analysis, CuratorError> {
        let tree = CategoryTree::read(input, &self.options.filter)?;
        let mut warnings = tree.warnings.clone();

        let mut primaries: Vec<(String, PathBuf)> = Vec::with_capacity(tree.identities.len());
        for (basename, identity) in &tree.identities {
            let primary = identity.primary().ok_or_else(|| DedupError::NoPrimaryImage {
                basename: basename.clone(),
            })?;
            primaries.push((basename.clone(), primary.to_path_buf()));
        }
        info!(identities = primaries.len(), input = %input.display(), "identities discovered");

        let fingerprinter = HasherConfig::new()
            .algorithm(self.options.algorithm)
            .hash_size(self.options.hash_size)
            .build()?;
        let (fingerprinted, failures) = self.fingerprint_all(&fingerprinter, &primaries, events);
        warnings.extend(failures);

        let strategy = ThresholdStrategy::new(threshold);
        let clusters = Clusterer::new(&strategy, fingerprinter.as_ref()).cluster(&fingerprinted);

        Ok(Analysis {
            threshold,
            identities: primaries.len(),
            tree,
            clusters,
            warnings,
        })
    }

    /// Copy every identity to its root and write the report.
    ///
    /// Both roots are removed again if anything here fails.
    fn write(
        &self,
        run_id: Uuid,
        input: &Path,
        roots: &Roots<'_>,
        analysis: Analysis,
        events: &EventSender,
    ) -> Result<(DedupReport, usize), CuratorError> {
        let Analysis {
            threshold,
            tree,
            identities,
            clusters,
            mut warnings,
        } = analysis;

        let mut jobs = Vec::with_capacity(tree.image_count());
        for cluster in &clusters {
            for (basename, root) in std::iter::once((&cluster.canonical, roots.output))
                .chain(cluster.duplicates.iter().map(|d| (d, roots.duplicates)))
            {
                if let Some(identity) = tree.identities.get(basename) {
                    for (variant, source) in &identity.files {
                        let Some(file_name) = source.file_name() else {
                            continue;
                        };
                        jobs.push(CopyJob {
                            source: source.clone(),
                            destination: root.join(variant.category_dir()).join(file_name),
                        });
                    }
                }
            }
        }

        let mut guard = RunGuard::new();
        guard.claim_dir(roots.output, roots.output_existed)?;
        guard.claim_dir(roots.duplicates, roots.duplicates_existed)?;
        let files_written = execute_copies(&jobs, LinkMode::Copy, events)?;

        let source_run_id = match ReorganizeManifest::read(input) {
            Ok(manifest) => manifest.map(|m| m.run_id),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable reorganize manifest");
                warnings.push(format!("ignored unreadable manifest: {e}"));
                None
            }
        };

        let kept = clusters.len();
        let duplicate_count: usize = clusters.iter().map(|c| c.duplicates.len()).sum();
        let report = DedupReport {
            run_id,
            source_run_id,
            created_at: Utc::now(),
            input_root: input.to_path_buf(),
            threshold,
            algorithm: self.options.algorithm,
            hash_size: self.options.hash_size,
            identities,
            kept,
            duplicates: duplicate_count,
            clusters,
            warnings,
        };
        write_guarded(&mut guard, &roots.output.join(DEDUP_REPORT_FILE), &report.to_json()?)?;
        guard.commit();

        info!(
            kept,
            duplicates = duplicate_count,
            files = files_written,
            "dedup complete"
        );
        Ok((report, files_written))
    }

    /// Fingerprint every primary image; failures come back as `None` plus a warning.
    fn fingerprint_all(
        &self,
        fingerprinter: &Arc<dyn Fingerprinter>,
        primaries: &[(String, PathBuf)],
        events: &EventSender,
    ) -> (Vec<(String, Option<Fingerprint>)>, Vec<String>) {
        let total = primaries.len();
        let completed = AtomicUsize::new(0);
        events.send(Event::Fingerprint(FingerprintEvent::Started { total }));

        let results: Vec<(String, Result<Fingerprint, String>)> = primaries
            .par_iter()
            .map(|(basename, path)| {
                let result =
                    fingerprint_with_timeout(fingerprinter, path, self.options.fingerprint_timeout);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                let result = result.map_err(|e| {
                    warn!(path = %path.display(), error = %e, "fingerprint failed");
                    events.send(Event::Fingerprint(FingerprintEvent::Failed {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                    format!("kept {basename} unclustered: {e}")
                });
                events.send(Event::Fingerprint(FingerprintEvent::Progress(
                    FingerprintProgress {
                        completed: done,
                        total,
                        current_path: path.clone(),
                    },
                )));
                (basename.clone(), result)
            })
            .collect();

        let mut failures = Vec::new();
        let fingerprints: Vec<(String, Option<Fingerprint>)> = results
            .into_iter()
            .map(|(basename, result)| match result {
                Ok(fingerprint) => (basename, Some(fingerprint)),
                Err(message) => {
                    failures.push(message);
                    (basename, None)
                }
            })
            .collect();

        events.send(Event::Fingerprint(FingerprintEvent::Completed {
            fingerprinted: total - failures.len(),
            failures: failures.len(),
        }));
        (fingerprints, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use image::{ImageBuffer, Rgb};
    use std::fs;
    use tempfile::TempDir;

    fn write_image(path: &Path, bright_left: bool) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = ImageBuffer::from_fn(64, 64, |x, _| {
            let v = if (x < 32) == bright_left { 230u8 } else { 20u8 };
            Rgb([v, v, v])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn negative_threshold_is_rejected_before_io() {
        let temp = TempDir::new().unwrap();
        let err = Deduplicator::new(DedupOptions::default().threshold(-1))
            .run(
                &temp.path().join("missing"),
                &temp.path().join("out"),
                &temp.path().join("dups"),
                &null_sender(),
            )
            .unwrap_err();

        assert_eq!(err.kind(), "ThresholdOutOfRangeError");
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn thresholds_past_u32_saturate() {
        assert_eq!(
            DedupOptions::default().threshold(5_000_000_000).checked_threshold().unwrap(),
            u32::MAX
        );

        let temp = TempDir::new().unwrap();
        let input = temp.path().join("reorganized");
        write_image(&input.join("fronts/a.png"), true);
        write_image(&input.join("fronts/b.png"), false);

        let result = Deduplicator::new(DedupOptions::default().threshold(5_000_000_000))
            .run(&input, &temp.path().join("out"), &temp.path().join("dups"), &null_sender())
            .unwrap();

        assert_eq!(result.kept, 1);
        assert_eq!(result.duplicates, 1);
    }

    #[test]
    fn aliased_roots_are_refused_before_writing() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("reorganized");
        write_image(&input.join("fronts/a.png"), true);
        write_image(&input.join("fronts/b.png"), true);
        let output = temp.path().join("out");
        let dedup = Deduplicator::new(DedupOptions::default().threshold(0));

        let err = dedup
            .run(&input, &output, &temp.path().join("x/../out"), &null_sender())
            .unwrap_err();
        assert_eq!(err.kind(), "OutputOverlapError");
        assert!(!output.exists());

        let err = dedup
            .run(&input, &output, &output.join("dups"), &null_sender())
            .unwrap_err();
        assert_eq!(err.kind(), "OutputOverlapError");
        assert!(!output.exists());
    }

    #[test]
    fn failed_copy_removes_both_roots() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("reorganized");
        write_image(&input.join("fronts/a.png"), true);
        write_image(&input.join("fronts/b.png"), true);
        write_image(&input.join("backs/b.png"), false);
        let output = temp.path().join("out");
        let dups = temp.path().join("dups");
        fs::create_dir(&dups).unwrap();

        let dedup = Deduplicator::new(DedupOptions::default().threshold(0));
        let analysis = dedup.analyze(&input, 0, &null_sender()).unwrap();
        assert_eq!(analysis.clusters.len(), 1);
        fs::remove_file(input.join("backs/b.png")).unwrap();

        let roots = Roots {
            output: &output,
            output_existed: false,
            duplicates: &dups,
            duplicates_existed: true,
        };
        let err = dedup
            .write(Uuid::new_v4(), &input, &roots, analysis, &null_sender())
            .unwrap_err();

        assert_eq!(err.kind(), "PartialWriteError");
        assert!(!output.exists());
        assert_eq!(fs::read_dir(&dups).unwrap().count(), 0);
    }

    #[test]
    fn identical_photos_are_split() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("reorganized");
        write_image(&input.join("fronts/a.png"), true);
        write_image(&input.join("backs/a.png"), false);
        write_image(&input.join("fronts/b.png"), true);
        write_image(&input.join("backs/b.png"), false);
        write_image(&input.join("fronts/c.png"), false);

        let output = temp.path().join("out");
        let dups = temp.path().join("dups");
        let result = Deduplicator::new(DedupOptions::default().threshold(0))
            .run(&input, &output, &dups, &null_sender())
            .unwrap();

        assert_eq!(result.identities, 3);
        assert_eq!(result.kept, 2);
        assert_eq!(result.duplicates, 1);
        assert!(output.join("fronts/a.png").exists());
        assert!(output.join("backs/a.png").exists());
        assert!(output.join("fronts/c.png").exists());
        assert!(dups.join("fronts/b.png").exists());
        assert!(dups.join("backs/b.png").exists());
        assert!(!output.join("fronts/b.png").exists());
        assert!(input.join("fronts/b.png").exists());

        let report = DedupReport::read(&output).unwrap().unwrap();
        assert_eq!(report.run_id, result.run_id);
        assert_eq!(report.threshold, 0);
    }

    #[test]
    fn back_only_identity_fails_before_writing() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("reorganized");
        write_image(&input.join("fronts/a.png"), true);
        write_image(&input.join("backs/z.png"), true);

        let output = temp.path().join("out");
        let err = Deduplicator::new(DedupOptions::default())
            .run(&input, &output, &temp.path().join("dups"), &null_sender())
            .unwrap_err();

        assert_eq!(err.kind(), "NoPrimaryImageError");
        assert!(!output.exists());
    }

    #[test]
    fn undecodable_front_is_kept_alone() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("reorganized");
        write_image(&input.join("fronts/a.png"), true);
        fs::create_dir_all(input.join("fronts")).unwrap();
        fs::write(input.join("fronts/broken.png"), b"not a png").unwrap();

        let output = temp.path().join("out");
        let result = Deduplicator::new(DedupOptions::default())
            .run(&input, &output, &temp.path().join("dups"), &null_sender())
            .unwrap();

        assert_eq!(result.kept, 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(output.join("fronts/broken.png").exists());
    }

    #[test]
    fn non_empty_duplicates_root_is_refused() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("reorganized");
        write_image(&input.join("fronts/a.png"), true);
        let dups = temp.path().join("dups");
        fs::create_dir_all(&dups).unwrap();
        fs::write(dups.join("old.txt"), b"keep").unwrap();

        let err = Deduplicator::new(DedupOptions::default())
            .run(&input, &temp.path().join("out"), &dups, &null_sender())
            .unwrap_err();

        assert_eq!(err.kind(), "OutputNotEmptyError");
        assert!(dups.join("old.txt").exists());
    }
}
