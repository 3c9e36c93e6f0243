//! Per-file time limit for fingerprinting.

use super::{Fingerprint, Fingerprinter};
use crate::error::HashError;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Fingerprint `path` on a helper thread, giving up after `timeout`.
///
/// A file that takes too long is abandoned: its worker keeps running
/// until the decoder returns, but the result is discarded.
pub fn fingerprint_with_timeout(
    fingerprinter: &Arc<dyn Fingerprinter>,
    path: &Path,
    timeout: Duration,
) -> Result<Fingerprint, HashError> {
    let (tx, rx) = bounded(1);
    let worker = Arc::clone(fingerprinter);
    let owned = path.to_path_buf();

    thread::Builder::new()
        .name("fingerprint".to_string())
        .spawn(move || {
            let _ = tx.send(worker.fingerprint(&owned));
        })
        .map_err(|e| HashError::ComputationFailed(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(path = %path.display(), timeout_ms = timeout.as_millis() as u64, "fingerprint timed out");
            Err(HashError::Timeout {
                path: path.to_path_buf(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(HashError::ComputationFailed(format!(
            "worker for {} stopped without a result",
            path.display()
        ))),
    }
}
