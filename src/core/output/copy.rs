//! Parallel file materialization.

use crate::error::OutputError;
use crate::events::{CopyEvent, CopyProgress, Event, EventSender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error};

/// How a file reaches its destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// Independent copy
    #[default]
    Copy,
    /// Hard link, falling back to a copy across filesystems
    HardLink,
}

/// One file to place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Place a single file, verifying the copied size.
pub fn materialize(source: &Path, destination: &Path, mode: LinkMode) -> io::Result<()> {
    if mode == LinkMode::HardLink && fs::hard_link(source, destination).is_ok() {
        return Ok(());
    }

    let source_size = fs::metadata(source)?.len();
    let copied = fs::copy(source, destination)?;
    if copied != source_size {
        let _ = fs::remove_file(destination);
        return Err(io::Error::other(format!(
            "copy verification failed: source {source_size} bytes, destination {copied} bytes"
        )));
    }
    Ok(())
}

/// Run all jobs on the rayon pool.
///
/// The jobs must be fully planned before this is called. The first
/// failure aborts the batch with [`OutputError::PartialWrite`]; the
/// caller's [`RunGuard`](super::RunGuard) removes what was written.
pub fn execute_copies(
    jobs: &[CopyJob],
    mode: LinkMode,
    events: &EventSender,
) -> Result<usize, OutputError> {
    let total = jobs.len();
    events.send(Event::Copy(CopyEvent::Started { total }));

    let parents: BTreeSet<&Path> = jobs.iter().filter_map(|j| j.destination.parent()).collect();
    for parent in parents {
        fs::create_dir_all(parent).map_err(|e| OutputError::PartialWrite {
            path: parent.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    let completed = AtomicUsize::new(0);
    jobs.par_iter().try_for_each(|job| {
        materialize(&job.source, &job.destination, mode).map_err(|e| {
            error!(
                source = %job.source.display(),
                destination = %job.destination.display(),
                error = %e,
                "copy failed"
            );
            OutputError::PartialWrite {
                path: job.destination.clone(),
                reason: format!("copying {}: {}", job.source.display(), e),
            }
        })?;

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        events.send(Event::Copy(CopyEvent::Progress(CopyProgress {
            completed: done,
            total,
            current_path: job.destination.clone(),
        })));
        Ok(())
    })?;

    debug!(copied = total, ?mode, "copies complete");
    events.send(Event::Copy(CopyEvent::Completed { copied: total }));
    Ok(total)
}
