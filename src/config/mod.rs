//! # Config Module
//!
//! Optional TOML settings file. Every field has a default, so an absent
//! file or an empty table behaves like the built-in scanner conventions.
//!
//! ```toml
//! [scanner]
//! enhanced_suffix = "_a"
//! back_suffix = "_b"
//! extensions = ["jpg", "jpeg", "tif"]
//!
//! [fingerprint]
//! algorithm = "difference"
//! hash_size = 16
//! timeout_secs = 20
//!
//! [dedup]
//! threshold = 6
//! ```

use crate::core::dedup::DedupOptions;
use crate::core::hasher::FingerprintKind;
use crate::core::scanner::{ScanConfig, VariantClassifier};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// All user-tunable settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scanner: ScannerSettings,
    pub fingerprint: FingerprintSettings,
    pub dedup: DedupSettings,
}

/// Naming conventions of the scanning device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub enhanced_suffix: String,
    pub back_suffix: String,
    /// Replace spaces in basenames with underscores
    pub normalize_spaces: bool,
    /// Extensions to index (None = built-in image list)
    pub extensions: Option<Vec<String>>,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            enhanced_suffix: "_a".to_string(),
            back_suffix: "_b".to_string(),
            normalize_spaces: true,
            extensions: None,
            include_hidden: false,
            follow_symlinks: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintSettings {
    pub algorithm: FingerprintKind,
    pub hash_size: u32,
    pub timeout_secs: u64,
}

impl Default for FingerprintSettings {
    fn default() -> Self {
        Self {
            algorithm: FingerprintKind::Average,
            hash_size: 8,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSettings {
    pub threshold: i64,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let scanner = &self.scanner;
        if scanner.enhanced_suffix.is_empty() || scanner.back_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "scanner suffixes must not be empty".to_string(),
            ));
        }
        if scanner
            .enhanced_suffix
            .eq_ignore_ascii_case(&scanner.back_suffix)
        {
            return Err(ConfigError::Invalid(format!(
                "enhanced and back suffix are both '{}'",
                scanner.back_suffix
            )));
        }
        if !matches!(self.fingerprint.hash_size, 4..=64) {
            return Err(ConfigError::Invalid(format!(
                "fingerprint.hash_size {} is outside 4..=64",
                self.fingerprint.hash_size
            )));
        }
        if self.fingerprint.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fingerprint.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Scanner configuration derived from these settings
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            follow_symlinks: self.scanner.follow_symlinks,
            include_hidden: self.scanner.include_hidden,
            extensions: self.scanner.extensions.clone(),
            classifier: VariantClassifier::new(
                &self.scanner.enhanced_suffix,
                &self.scanner.back_suffix,
            )
            .normalize_spaces(self.scanner.normalize_spaces),
        }
    }

    pub fn fingerprint_timeout(&self) -> Duration {
        Duration::from_secs(self.fingerprint.timeout_secs)
    }

    /// Dedup options with the configured defaults; the CLI may override the threshold
    pub fn dedup_options(&self) -> DedupOptions {
        DedupOptions::default()
            .threshold(self.dedup.threshold)
            .algorithm(self.fingerprint.algorithm)
            .hash_size(self.fingerprint.hash_size)
            .fingerprint_timeout(self.fingerprint_timeout())
            .filter(self.scan_config().filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_file_gives_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.dedup.threshold, 5);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scanner]\nback_suffix = \"_rev\"\n[fingerprint]\nalgorithm = \"exact\"").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.scanner.back_suffix, "_rev");
        assert_eq!(settings.scanner.enhanced_suffix, "_a");
        assert_eq!(settings.fingerprint.algorithm, FingerprintKind::Exact);
        assert_eq!(settings.fingerprint.hash_size, 8);
    }

    #[test]
    fn identical_suffixes_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scanner]\nenhanced_suffix = \"_x\"\nback_suffix = \"_X\"").unwrap();

        assert!(matches!(
            Settings::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[dedup\nthreshold = ").unwrap();

        let err = Settings::load(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn dedup_options_follow_settings() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[fingerprint]\nalgorithm = \"difference\"\nhash_size = 16\n[dedup]\nthreshold = 9").unwrap();

        let options = Settings::load(file.path()).unwrap().dedup_options();
        assert_eq!(options.threshold, 9);
        assert_eq!(options.algorithm, FingerprintKind::Difference);
        assert_eq!(options.hash_size, 16);
        assert_eq!(options.fingerprint_timeout, Duration::from_secs(30));
    }
}
