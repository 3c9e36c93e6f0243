//! File filtering logic for the scanner.

use std::collections::HashSet;
use std::path::Path;

/// Extensions indexed when no explicit list is configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "bmp", "webp", "heic", "heif", "gif",
];

/// Decides which files are scanned images
#[derive(Debug, Clone)]
pub struct ImageFilter {
    /// Lower-cased extensions to include
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl ImageFilter {
    /// Create a new filter with the default image extensions
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// True for hidden names when hidden files are excluded
    pub fn is_excluded_hidden(&self, path: &Path) -> bool {
        !self.include_hidden
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with('.'))
    }

    /// Lower-cased extension if it is a recognized image extension
    pub fn image_extension(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.extensions.contains(&ext).then_some(ext)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}
