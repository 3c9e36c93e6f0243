//! Variant classification by filename suffix.
//!
//! The `_a`/`_b` convention belongs to one scanner model; other
//! conventions are configured by constructing a classifier with
//! different suffixes.

use super::Variant;

/// Maps a file stem to `(basename, variant)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantClassifier {
    enhanced_suffix: String,
    back_suffix: String,
    normalize_spaces: bool,
}

impl VariantClassifier {
    /// Create a classifier for the given suffixes (compared case-insensitively)
    pub fn new(enhanced_suffix: &str, back_suffix: &str) -> Self {
        Self {
            enhanced_suffix: enhanced_suffix.to_lowercase(),
            back_suffix: back_suffix.to_lowercase(),
            normalize_spaces: true,
        }
    }

    /// Replace spaces in basenames with underscores
    pub fn normalize_spaces(mut self, enabled: bool) -> Self {
        self.normalize_spaces = enabled;
        self
    }

    /// Classify a file stem. Stems matching no suffix are fronts.
    pub fn classify(&self, stem: &str) -> (String, Variant) {
        let (basename, variant) = if let Some(base) = strip_suffix_ci(stem, &self.enhanced_suffix) {
            (base, Variant::EnhancedFront)
        } else if let Some(base) = strip_suffix_ci(stem, &self.back_suffix) {
            (base, Variant::Back)
        } else {
            (stem, Variant::Front)
        };

        let basename = if self.normalize_spaces {
            basename.replace(' ', "_")
        } else {
            basename.to_string()
        };

        (basename, variant)
    }
}

impl Default for VariantClassifier {
    fn default() -> Self {
        Self::new("_a", "_b")
    }
}

/// Strip a lower-cased suffix ignoring case; an empty remainder does not count.
fn strip_suffix_ci<'a>(stem: &'a str, suffix: &str) -> Option<&'a str> {
    if stem.len() <= suffix.len() {
        return None;
    }
    let split = stem.len() - suffix.len();
    if !stem.is_char_boundary(split) {
        return None;
    }
    let (base, tail) = stem.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(base)
}
