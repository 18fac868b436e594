//! # Catalog Module
//!
//! The ordered set of images from one folder.
//!
//! Only `.png`, `.jpg` and `.jpeg` files (any case) directly inside the
//! folder take part. Items are identified by path and kept in natural
//! order of their file names. Loading a new folder replaces the whole
//! catalog; there is no merging.
//!
//! ## Example
//! ```rust,ignore
//! let loader = CatalogLoader::default();
//! let summary = loader.load(&folder, &events, &CancellationToken::new())?;
//! let catalog = Catalog::new(summary.items);
//! ```

mod filter;
mod loader;
mod thumbnail;

pub use filter::{ImageFilter, IMAGE_EXTENSIONS};
pub use loader::{CatalogLoader, LoadSummary};
pub use thumbnail::{Thumbnail, ThumbnailConfig, Thumbnailer};

use crate::core::ordering::{display_name, NaturalKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One image in the catalog
#[derive(Debug, Clone)]
pub struct ImageItem {
    /// Identity: the file path
    pub path: PathBuf,
    /// File name shown to the user
    pub display_name: String,
    /// Sort key derived from the display name
    pub sort_key: NaturalKey,
    /// Decoded preview, filled in as loading progresses
    pub thumbnail: Option<Thumbnail>,
}

impl ImageItem {
    pub fn new(path: PathBuf) -> Self {
        let display_name = display_name(&path);
        let sort_key = NaturalKey::new(&display_name);
        Self {
            path,
            display_name,
            sort_key,
            thumbnail: None,
        }
    }
}

/// Naturally ordered, path-indexed image collection
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    folder: Option<PathBuf>,
    items: Vec<ImageItem>,
    index: HashMap<PathBuf, usize>,
}

impl Catalog {
    /// Build a catalog from identities in any order. Duplicate paths are
    /// collapsed to one item.
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut items: Vec<ImageItem> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for path in paths {
            if seen.insert(path.clone()) {
                items.push(ImageItem::new(path));
            }
        }
        items.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));

        let index = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.path.clone(), i))
            .collect();

        Self {
            folder: None,
            items,
            index,
        }
    }

    /// Same as [`Catalog::new`], remembering the folder it came from
    pub fn for_folder(folder: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            folder: Some(folder.to_path_buf()),
            ..Self::new(paths)
        }
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&ImageItem> {
        self.index.get(path).map(|&i| &self.items[i])
    }

    /// Items in natural order
    pub fn iter(&self) -> impl Iterator<Item = &ImageItem> {
        self.items.iter()
    }

    /// Identities in natural order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.items.iter().map(|item| item.path.clone()).collect()
    }

    /// Attach a decoded thumbnail. Returns false for unknown paths.
    pub fn set_thumbnail(&mut self, path: &Path, thumbnail: Thumbnail) -> bool {
        match self.index.get(path) {
            Some(&i) => {
                self.items[i].thumbnail = Some(thumbnail);
                true
            }
            None => false,
        }
    }

    /// Drop every item
    pub fn clear(&mut self) {
        self.folder = None;
        self.items.clear();
        self.index.clear();
    }

    /// Default output document for this catalog: `<folder>/<folder name>.pdf`
    pub fn default_output_path(&self) -> Option<PathBuf> {
        let folder = self.folder.as_ref()?;
        let name = folder.file_name()?.to_string_lossy();
        Some(folder.join(format!("{}.pdf", name)))
    }
}
