//! Assembles one collection version.

use super::provenance::{Provenance, PROVENANCE_FILE, VERSION_FILE};
use super::version::{existing_versions, next_version, Version};
use super::{validate_name, InitOptions, InitResult};
use crate::core::dedup::DedupReport;
use crate::core::output::{
    ensure_vacant, execute_copies, write_guarded, CopyJob, LinkMode, RunGuard,
};
use crate::core::reorganize::ReorganizeManifest;
use crate::core::scanner::{CategoryTree, Variant, SIDECAR_EXTENSION};
use crate::core::xmp::{normalize_key, seed_sidecar};
use crate::error::{CollectionError, CuratorError, OutputError};
use crate::events::{Event, EventSender, Stage, StageEvent, StageSummary};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Builds `collections_root/<name>/<version>/` from a category tree
pub struct CollectionBuilder {
    options: InitOptions,
}

impl CollectionBuilder {
    pub fn new(options: InitOptions) -> Self {
        Self { options }
    }

    /// Build a new version of collection `name` from `source`.
    ///
    /// `VERSION` is written last; a version directory without it is an
    /// unfinished build and is removed again on failure.
    pub fn init(
        &self,
        source: &Path,
        name: &str,
        collections_root: &Path,
        events: &EventSender,
    ) -> Result<InitResult, CuratorError> {
        events.send(Event::Stage(StageEvent::Started {
            stage: Stage::Collecting,
        }));

        match self.execute(source, name, collections_root, events) {
            Ok(result) => {
                events.send(Event::Stage(StageEvent::Completed {
                    stage: Stage::Collecting,
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
                    stage: Stage::Collecting,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        source: &Path,
        name: &str,
        collections_root: &Path,
        events: &EventSender,
    ) -> Result<InitResult, CuratorError> {
        let start = Instant::now();
        validate_name(name)?;
        let _span = info_span!("collection", collection = name).entered();

        let mut tags = BTreeMap::new();
        for (key, value) in &self.options.tags {
            tags.insert(normalize_key(key)?, value.clone());
        }
        if !source.is_dir() {
            return Err(CollectionError::SourceMissing {
                path: source.to_path_buf(),
            }
            .into());
        }

        let collection_dir = collections_root.join(name);
        let version = self.resolve_version(name, &collection_dir)?;
        let version_dir = collection_dir.join(version.to_string());
        info!(%version, dir = %version_dir.display(), "building collection version");

        let tree = CategoryTree::read(source, &self.options.filter)?;
        let mut warnings = tree.warnings.clone();

        let mut image_jobs = Vec::with_capacity(tree.image_count());
        let mut sidecar_paths = Vec::with_capacity(tree.image_count());
        for identity in tree.identities.values() {
            for (variant, path) in &identity.files {
                let Some(file_name) = path.file_name() else {
                    continue;
                };
                let destination = version_dir.join(variant.category_dir()).join(file_name);
                sidecar_paths.push(destination.with_extension(SIDECAR_EXTENSION));
                image_jobs.push(CopyJob {
                    source: path.clone(),
                    destination,
                });
            }
        }
        let sidecar_jobs: Vec<CopyJob> = tree
            .sidecars
            .iter()
            .filter_map(|(variant, path)| {
                Some(CopyJob {
                    source: path.clone(),
                    destination: version_dir.join(variant.category_dir()).join(path.file_name()?),
                })
            })
            .collect();

        let mut guard = RunGuard::new();
        if !collection_dir.exists() {
            guard.claim_dir(&collection_dir, false)?;
        }
        let existed = ensure_vacant(&version_dir)?;
        guard.claim_dir(&version_dir, existed)?;
        for variant in Variant::ALL {
            let dir = version_dir.join(variant.category_dir());
            fs::create_dir_all(&dir).map_err(|e| OutputError::PartialWrite {
                path: dir,
                reason: e.to_string(),
            })?;
        }

        let mut files_written = execute_copies(&image_jobs, self.options.link_mode, events)?;
        // Sidecars are edited below, so they never share an inode with the source
        files_written += execute_copies(&sidecar_jobs, LinkMode::Copy, events)?;

        let seed_tags: Vec<(String, String)> = tags.clone().into_iter().collect();
        let created = AtomicUsize::new(0);
        let updated = AtomicUsize::new(0);
        sidecar_paths.par_iter().try_for_each(|path| {
            if seed_tags.is_empty() && path.exists() {
                return Ok(());
            }
            let was_created = seed_sidecar(path, &seed_tags).map_err(|e| {
                OutputError::PartialWrite {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            let counter = if was_created { &created } else { &updated };
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), OutputError>(())
        })?;
        let sidecars_created = created.into_inner();
        let sidecars_updated = updated.into_inner();
        files_written += sidecars_created;

        let (reorganize_run_id, dedup_run_id) = source_runs(source, &mut warnings);
        let provenance = Provenance {
            collection: name.to_string(),
            version,
            created_at: Utc::now(),
            source: source.to_path_buf(),
            reorganize_run_id,
            dedup_run_id,
            link_mode: self.options.link_mode,
            tags,
            photos: tree.identities.len(),
        };
        write_guarded(
            &mut guard,
            &version_dir.join(PROVENANCE_FILE),
            &provenance.to_json()?,
        )?;
        write_guarded(
            &mut guard,
            &version_dir.join(VERSION_FILE),
            version.to_string().as_bytes(),
        )?;
        guard.commit();

        info!(
            %version,
            photos = provenance.photos,
            files = files_written,
            sidecars_created,
            "collection version committed"
        );

        Ok(InitResult {
            collection: provenance.collection,
            version,
            path: version_dir,
            photos: provenance.photos,
            files_written,
            sidecars_created,
            sidecars_updated,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Pick the version to build, clearing an unfinished explicit one.
    fn resolve_version(&self, name: &str, collection_dir: &Path) -> Result<Version, CuratorError> {
        let Some(version) = self.options.version else {
            let existing = existing_versions(collection_dir)?;
            return next_version(&existing).ok_or_else(|| {
                CollectionError::VersionsExhausted {
                    name: name.to_string(),
                }
                .into()
            });
        };

        let version_dir = collection_dir.join(version.to_string());
        if version_dir.join(VERSION_FILE).exists() {
            return Err(CollectionError::Exists { path: version_dir }.into());
        }
        if version_dir.exists() {
            warn!(dir = %version_dir.display(), "removing unfinished version directory");
            fs::remove_dir_all(&version_dir).map_err(|e| OutputError::PartialWrite {
                path: version_dir.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(version)
    }
}

/// Run ids recorded by the stages that produced `source`
fn source_runs(source: &Path, warnings: &mut Vec<String>) -> (Option<Uuid>, Option<Uuid>) {
    let mut reorganize_run_id = None;
    let mut dedup_run_id = None;

    match DedupReport::read(source) {
        Ok(Some(report)) => {
            dedup_run_id = Some(report.run_id);
            reorganize_run_id = report.source_run_id;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "ignoring unreadable dedup report");
            warnings.push(format!("ignored unreadable dedup report: {e}"));
        }
    }
    if reorganize_run_id.is_none() {
        match ReorganizeManifest::read(source) {
            Ok(manifest) => reorganize_run_id = manifest.map(|m| m.run_id),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable reorganize manifest");
                warnings.push(format!("ignored unreadable manifest: {e}"));
            }
        }
    }
    (reorganize_run_id, dedup_run_id)
}
