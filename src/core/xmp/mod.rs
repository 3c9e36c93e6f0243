//! # XMP Module
//!
//! Reading and writing `.xmp` sidecars.
//!
//! A sidecar holds free-form tags (`prefix:local` → text) and, once a face
//! recognizer has run, a list of MWG face regions. The collection builder
//! seeds tags; everything else in an existing sidecar is kept.

mod namespaces;
mod parse;
mod sidecar;
mod upsert;

pub use namespaces::{namespace_for, normalize_key, TAG_NAMESPACES};
pub use sidecar::{FaceRegion, RegionArea, XmpSidecar};

use crate::error::XmpError;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Parse the sidecar at `path`.
pub fn read_sidecar(path: &Path) -> Result<XmpSidecar, XmpError> {
    XmpSidecar::read(path)
}

/// Write `sidecar` to `path`, replacing any existing file.
pub fn write_sidecar(path: &Path, sidecar: &XmpSidecar) -> Result<(), XmpError> {
    sidecar.write(path)
}

/// Upsert `tags` into the sidecar at `path`, creating a minimal one if absent.
///
/// Only the seeded properties of an existing sidecar are rewritten; the
/// rest of the document is kept as written. Returns `true` when the file
/// was created.
pub fn seed_sidecar(path: &Path, tags: &[(String, String)]) -> Result<bool, XmpError> {
    let mut normalized = BTreeMap::new();
    for (key, value) in tags {
        normalized.insert(normalize_key(key)?, value.clone());
    }
    let io_error = |source: std::io::Error| XmpError::Io {
        path: path.to_path_buf(),
        source,
    };

    let created = match fs::read_to_string(path) {
        Ok(xml) => {
            let updated = upsert::upsert(&xml, path, &normalized)?;
            fs::write(path, updated).map_err(io_error)?;
            false
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let mut sidecar = XmpSidecar::new();
            sidecar.upsert_tags(tags)?;
            sidecar.write(path)?;
            true
        }
        Err(source) => return Err(io_error(source)),
    };
    debug!(path = %path.display(), created, tags = tags.len(), "sidecar seeded");
    Ok(created)
}
