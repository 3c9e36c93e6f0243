//! Four-digit collection versions.

use crate::error::CollectionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

/// A collection version, shown zero-padded (`0000` to `9999`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(u16);

impl Version {
    pub const FIRST: Version = Version(0);
    pub const LAST: Version = Version(9999);

    pub fn new(value: u16) -> Option<Self> {
        (value <= Self::LAST.0).then_some(Self(value))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// The following version, or `None` after `9999`
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for Version {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CollectionError::InvalidVersion {
            value: s.to_string(),
        };
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<u16>().map(Version).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Version {
    type Error = CollectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

/// Version directories present under a collection directory, ascending.
///
/// Any directory with a four-digit name counts, finished or not.
pub fn existing_versions(collection_dir: &Path) -> Result<Vec<Version>, CollectionError> {
    let entries = match fs::read_dir(collection_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(CollectionError::Read {
                path: collection_dir.to_path_buf(),
                source,
            })
        }
    };

    let mut versions: Vec<Version> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .collect();
    versions.sort();
    Ok(versions)
}

/// Version for a new build: one past the highest existing version.
///
/// Deleted low versions are never reused. `None` once `9999` is taken.
pub fn next_version(existing: &[Version]) -> Option<Version> {
    match existing.iter().max() {
        Some(highest) => highest.next(),
        None => Some(Version::FIRST),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_exactly_four_digits() {
        assert_eq!("0003".parse::<Version>().unwrap().value(), 3);
        assert_eq!("9999".parse::<Version>().unwrap(), Version::LAST);
        for bad in ["3", "003", "00003", "abcd", "-001", "+001", ""] {
            assert!(bad.parse::<Version>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn displays_zero_padded() {
        assert_eq!(Version::new(42).unwrap().to_string(), "0042");
        assert!(Version::new(10000).is_none());
    }

    #[test]
    fn next_skips_past_highest() {
        assert_eq!(next_version(&[]), Some(Version::FIRST));

        let existing = [Version::new(1).unwrap(), Version::new(4).unwrap()];
        assert_eq!(next_version(&existing), Version::new(5));
    }

    #[test]
    fn exhausted_after_last() {
        assert_eq!(next_version(&[Version::LAST]), None);
    }

    #[test]
    fn existing_versions_ignore_other_entries() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("0002")).unwrap();
        fs::create_dir(temp.path().join("0000")).unwrap();
        fs::create_dir(temp.path().join("draft")).unwrap();
        fs::write(temp.path().join("0007"), b"not a dir").unwrap();

        let versions = existing_versions(temp.path()).unwrap();
        assert_eq!(versions, vec![Version::FIRST, Version::new(2).unwrap()]);
        assert!(existing_versions(&temp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&Version::new(7).unwrap()).unwrap();
        assert_eq!(json, "\"0007\"");
        assert!(serde_json::from_str::<Version>("\"12\"").is_err());
    }
}
