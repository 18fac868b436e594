//! File filtering logic for folder loading.

use std::collections::HashSet;
use std::path::Path;

/// Extensions that take part in curation
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decides which folder entries are catalog images
pub struct ImageFilter {
    extensions: HashSet<String>,
}

impl ImageFilter {
    /// Create a filter accepting `.png`, `.jpg` and `.jpeg`
    pub fn new() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Check if a file should be included (extension match is case-insensitive)
    pub fn should_include(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}
