//! Folder loading: list, order, then decode thumbnails one by one.

use super::filter::ImageFilter;
use super::thumbnail::{ThumbnailConfig, Thumbnailer};
use crate::core::decode::FastDecoder;
use crate::core::orchestrator::CancellationToken;
use crate::core::ordering::{display_name, sort_paths_natural};
use crate::error::CatalogError;
use crate::events::{CatalogEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of one loading pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Identities in natural order
    pub items: Vec<PathBuf>,
    /// Items whose thumbnails were produced
    pub decoded: usize,
    /// Items skipped because their bytes were not an image
    pub failed: usize,
    /// Whether the pass stopped early on a stop request
    pub cancelled: bool,
}

/// Loads a folder's images into catalog order
pub struct CatalogLoader {
    filter: ImageFilter,
    thumbnails: ThumbnailConfig,
}

impl CatalogLoader {
    pub fn new(thumbnails: ThumbnailConfig) -> Self {
        Self {
            filter: ImageFilter::new(),
            thumbnails,
        }
    }

    /// List the folder's image files (non-recursive) in natural order.
    pub fn list(&self, folder: &Path) -> Result<Vec<PathBuf>, CatalogError> {
        if !folder.is_dir() {
            return Err(CatalogError::FolderNotFound {
                path: folder.to_path_buf(),
            });
        }

        let mut paths = Vec::new();

        for entry_result in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            match entry_result {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.filter.should_include(entry.path()) {
                        paths.push(entry.into_path());
                    }
                }
                // The folder itself could not be read
                Err(e) if e.depth() == 0 => {
                    let path = folder.to_path_buf();
                    let kind = e.io_error().map(|io| io.kind());
                    return Err(match kind {
                        Some(ErrorKind::PermissionDenied) => CatalogError::PermissionDenied { path },
                        _ => CatalogError::ReadFolder {
                            path,
                            source: e
                                .into_io_error()
                                .unwrap_or_else(|| std::io::Error::other("folder walk failed")),
                        },
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable folder entry");
                }
            }
        }

        sort_paths_natural(&mut paths);
        Ok(paths)
    }

    /// List the folder, announce the ordered identities, then decode every
    /// item's thumbnail in order, checking `stop` between items.
    pub fn load(
        &self,
        folder: &Path,
        events: &EventSender,
        stop: &CancellationToken,
    ) -> Result<LoadSummary, CatalogError> {
        events.send(Event::Catalog(CatalogEvent::Started {
            folder: folder.to_path_buf(),
        }));
        events.info(format!("Loading images from '{}'...", folder.display()));

        let items = self.list(folder)?;
        info!(folder = %folder.display(), count = items.len(), "Folder listed");

        events.send(Event::Catalog(CatalogEvent::Listed {
            items: items.clone(),
        }));

        let mut thumbnailer = Thumbnailer::new(self.thumbnails);
        let mut decoded = 0;
        let mut failed = 0;
        let mut cancelled = false;

        for path in &items {
            if stop.is_cancelled() {
                info!("Loading interrupted by stop request");
                cancelled = true;
                break;
            }

            let result = FastDecoder::decode(path).and_then(|image| thumbnailer.make(path, &image));
            match result {
                Ok(thumbnail) => {
                    debug!(path = %path.display(), "Thumbnail decoded");
                    decoded += 1;
                    events.send(Event::Catalog(CatalogEvent::ThumbnailDecoded {
                        path: path.clone(),
                        thumbnail,
                    }));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping undecodable image");
                    failed += 1;
                    events.warn(format!(
                        "Warning: skipping image that could not be loaded '{}': {}",
                        display_name(path),
                        e
                    ));
                    events.send(Event::Catalog(CatalogEvent::DecodeFailed {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        }

        events.info(format!("Loading finished: {} images.", items.len()));
        events.send(Event::Catalog(CatalogEvent::Finished {
            total: items.len(),
            decoded,
            cancelled,
        }));

        Ok(LoadSummary {
            items,
            decoded,
            failed,
            cancelled,
        })
    }
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new(ThumbnailConfig::default())
    }
}
