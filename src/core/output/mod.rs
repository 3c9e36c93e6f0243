//! # Output Module
//!
//! Ownership of a stage's output locations for the length of one run.
//!
//! Every stage follows the same shape:
//! 1. check that each output location is absent or empty ([`ensure_vacant`])
//! 2. claim the locations with a [`RunGuard`]
//! 3. copy files ([`execute_copies`]), then write manifest/marker files
//! 4. [`RunGuard::commit`]
//!
//! Dropping an uncommitted guard removes everything it claimed, so an
//! early return through `?` never leaves a half-written tree behind.

mod copy;

pub use copy::{execute_copies, materialize, CopyJob, LinkMode};

use crate::error::OutputError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Fail with [`OutputError::NotEmpty`] if `path` exists and has any entry.
///
/// Returns whether the directory already existed.
pub fn ensure_vacant(path: &Path) -> Result<bool, OutputError> {
    match fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                Err(OutputError::NotEmpty {
                    path: path.to_path_buf(),
                })
            } else {
                Ok(true)
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(_) if path.is_file() => Err(OutputError::NotEmpty {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(OutputError::Inspect {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Absolute, symlink-free form of `path` for comparing output roots.
///
/// The longest existing prefix is canonicalized; the components after it,
/// which name directories a run would create, are resolved lexically.
pub fn resolve_root(path: &Path) -> PathBuf {
    let mut existing: Vec<Component<'_>> = path.components().collect();
    let mut pending: Vec<Component<'_>> = Vec::new();

    let mut resolved = loop {
        let prefix: PathBuf = if existing.is_empty() {
            PathBuf::from(".")
        } else {
            existing.iter().collect()
        };
        if let Ok(canonical) = fs::canonicalize(&prefix) {
            break canonical;
        }
        match existing.pop() {
            Some(component) => pending.push(component),
            None => break prefix,
        }
    };

    for component in pending.into_iter().rev() {
        match component {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            other => resolved.push(other),
        }
    }
    resolved
}

/// Fail if two output roots are the same directory or one contains the other
pub fn ensure_disjoint(first: &Path, second: &Path) -> Result<(), OutputError> {
    let a = resolve_root(first);
    let b = resolve_root(second);
    if a.starts_with(&b) || b.starts_with(&a) {
        return Err(OutputError::Overlapping {
            first: first.to_path_buf(),
            second: second.to_path_buf(),
        });
    }
    Ok(())
}

#[derive(Debug)]
enum Claim {
    /// A directory created (or found empty) by this run
    Dir { path: PathBuf, existed: bool },
    /// A single file written by this run
    File(PathBuf),
}

/// Scoped ownership of a run's output.
///
/// Claims are rolled back in reverse order on drop unless
/// [`commit`](RunGuard::commit) was called.
#[derive(Debug, Default)]
pub struct RunGuard {
    claims: Vec<Claim>,
    committed: bool,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` (and parents) and own it for this run.
    ///
    /// Callers check [`ensure_vacant`] first; `existed` comes from there.
    pub fn claim_dir(&mut self, path: &Path, existed: bool) -> Result<(), OutputError> {
        fs::create_dir_all(path).map_err(|e| OutputError::PartialWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.claims.push(Claim::Dir {
            path: path.to_path_buf(),
            existed,
        });
        Ok(())
    }

    /// Own a file this run is about to write.
    pub fn claim_file(&mut self, path: &Path) {
        self.claims.push(Claim::File(path.to_path_buf()));
    }

    /// Keep everything; the run succeeded.
    pub fn commit(mut self) {
        self.committed = true;
    }

    fn rollback(&mut self) {
        for claim in self.claims.drain(..).rev() {
            match claim {
                Claim::File(path) => {
                    if let Err(e) = fs::remove_file(&path) {
                        if e.kind() != ErrorKind::NotFound {
                            warn!(path = %path.display(), error = %e, "rollback could not remove file");
                        }
                    }
                }
                Claim::Dir { path, existed } => {
                    if let Err(e) = fs::remove_dir_all(&path) {
                        if e.kind() != ErrorKind::NotFound {
                            warn!(path = %path.display(), error = %e, "rollback could not remove directory");
                        }
                    }
                    if existed {
                        if let Err(e) = fs::create_dir_all(&path) {
                            warn!(path = %path.display(), error = %e, "rollback could not recreate directory");
                        }
                    }
                    debug!(path = %path.display(), "rolled back");
                }
            }
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

/// Write `contents` to `path` as part of the guarded run.
pub fn write_guarded(guard: &mut RunGuard, path: &Path, contents: &[u8]) -> Result<(), OutputError> {
    guard.claim_file(path);
    fs::write(path, contents).map_err(|e| OutputError::PartialWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_vacant() {
        let temp = TempDir::new().unwrap();
        assert!(!ensure_vacant(&temp.path().join("fronts")).unwrap());
    }

    #[test]
    fn empty_directory_is_vacant() {
        let temp = TempDir::new().unwrap();
        assert!(ensure_vacant(temp.path()).unwrap());
    }

    #[test]
    fn directory_with_a_file_is_not_vacant() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep.jpg"), b"x").unwrap();

        let err = ensure_vacant(temp.path()).unwrap_err();
        assert!(matches!(err, OutputError::NotEmpty { .. }));
        assert!(temp.path().join("keep.jpg").exists());
    }

    #[test]
    fn aliased_roots_overlap() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let alias = temp.path().join("x/../out");

        assert_eq!(resolve_root(&alias), resolve_root(&out));
        assert!(matches!(
            ensure_disjoint(&out, &alias),
            Err(OutputError::Overlapping { .. })
        ));

        fs::create_dir(&out).unwrap();
        assert!(ensure_disjoint(&out.join("./dups"), &out).is_err());
        assert!(ensure_disjoint(&out, &temp.path().join("outside")).is_ok());
        assert!(ensure_disjoint(&out, &temp.path().join("out2")).is_ok());
    }

    #[test]
    fn uncommitted_guard_removes_claims() {
        let temp = TempDir::new().unwrap();
        let fronts = temp.path().join("out/fronts");
        let manifest = temp.path().join("out/manifest.json");

        {
            let mut guard = RunGuard::new();
            guard.claim_dir(&fronts, false).unwrap();
            fs::write(fronts.join("a.jpg"), b"x").unwrap();
            write_guarded(&mut guard, &manifest, b"{}").unwrap();
        }

        assert!(!fronts.exists());
        assert!(!manifest.exists());
    }

    #[test]
    fn pre_existing_empty_directory_survives_rollback_empty() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        fs::create_dir(&out).unwrap();

        {
            let mut guard = RunGuard::new();
            guard.claim_dir(&out, true).unwrap();
            fs::write(out.join("a.jpg"), b"x").unwrap();
        }

        assert!(out.exists());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn committed_guard_keeps_output() {
        let temp = TempDir::new().unwrap();
        let backs = temp.path().join("backs");

        let mut guard = RunGuard::new();
        guard.claim_dir(&backs, false).unwrap();
        fs::write(backs.join("a.jpg"), b"x").unwrap();
        guard.commit();

        assert!(backs.join("a.jpg").exists());
    }
}
