//! Executes a reorganize plan against the filesystem.

use super::manifest::{ReorganizeManifest, MANIFEST_FILE};
use super::planner::RenamePlanner;
use super::{OperationMode, ReorganizeOptions, ReorganizeResult};
use crate::core::output::{ensure_vacant, execute_copies, write_guarded, CopyJob, LinkMode, RunGuard};
use crate::core::scanner::{ScanIndex, Variant};
use crate::error::{CuratorError, OutputError};
use crate::events::{Event, EventSender, Stage, StageEvent, StageSummary};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Materializes an index into `fronts/`, `enhanced_fronts/` and `backs/`
pub struct Reorganizer {
    options: ReorganizeOptions,
}

impl Reorganizer {
    pub fn new(options: ReorganizeOptions) -> Self {
        Self { options }
    }

    /// Run the stage.
    ///
    /// Nothing is written unless every category directory under
    /// `output_root` is absent or empty. On failure everything this run
    /// created is removed again.
    pub fn run(
        &self,
        index: &ScanIndex,
        output_root: &Path,
        events: &EventSender,
    ) -> Result<ReorganizeResult, CuratorError> {
        events.send(Event::Stage(StageEvent::Started {
            stage: Stage::Reorganizing,
        }));

        match self.execute(index, output_root, events) {
            Ok(result) => {
                events.send(Event::Stage(StageEvent::Completed {
                    stage: Stage::Reorganizing,
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
                    stage: Stage::Reorganizing,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        index: &ScanIndex,
        output_root: &Path,
        events: &EventSender,
    ) -> Result<ReorganizeResult, CuratorError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let _span = info_span!("reorganize", %run_id, output = %output_root.display()).entered();

        let mut existing = Vec::with_capacity(Variant::ALL.len());
        for variant in Variant::ALL {
            let dir = output_root.join(variant.category_dir());
            existing.push((dir.clone(), ensure_vacant(&dir)?));
        }
        let manifest_path = output_root.join(MANIFEST_FILE);
        if manifest_path.exists() {
            return Err(OutputError::NotEmpty {
                path: manifest_path,
            }
            .into());
        }

        let plan = RenamePlanner::plan(index);
        info!(
            files = plan.files.len(),
            identities = plan.mapping.len(),
            renamed = plan.renamed_count(),
            "plan resolved"
        );

        let mut guard = RunGuard::new();
        if !output_root.exists() {
            guard.claim_dir(output_root, false)?;
        }
        for (dir, existed) in &existing {
            guard.claim_dir(dir, *existed)?;
        }

        let jobs: Vec<CopyJob> = plan
            .files
            .iter()
            .map(|file| CopyJob {
                source: file.source.clone(),
                destination: output_root.join(&file.relative_destination),
            })
            .collect();
        let files_written = execute_copies(&jobs, LinkMode::Copy, events)?;

        let manifest = ReorganizeManifest::new(run_id, &index.root, output_root, &plan.files);
        write_guarded(&mut guard, &manifest_path, &manifest.to_json()?)?;
        guard.commit();

        let mut warnings = Vec::new();
        if self.options.operation == OperationMode::Move {
            for file in &plan.files {
                if let Err(e) = fs::remove_file(&file.source) {
                    warn!(path = %file.source.display(), error = %e, "could not remove source");
                    warnings.push(format!(
                        "kept source {}: {}",
                        file.source.display(),
                        e
                    ));
                }
            }
        }

        let result = ReorganizeResult {
            run_id,
            identities: plan.mapping.len(),
            renamed: plan.renamed_count(),
            mapping: plan.mapping,
            files_written,
            manifest_path,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .with_scan_warnings(&index.warnings);

        info!(
            files = result.files_written,
            renamed = result.renamed,
            warnings = result.warnings.len(),
            "reorganize complete"
        );
        Ok(result)
    }
}
