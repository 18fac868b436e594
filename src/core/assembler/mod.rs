//! # Assembler Module
//!
//! Turns the final ordered selection into one PDF.
//!
//! The first image is the cover: if it cannot be decoded the whole job
//! fails and nothing is written. Later images that fail to decode are
//! skipped with a warning. Every page is converted to RGB and written at
//! a fixed resolution.

mod pdf;

pub use pdf::PdfBuilder;

use crate::core::decode::FastDecoder;
use crate::core::ordering::display_name;
use crate::error::AssemblyError;
use crate::events::{AssemblyEvent, Event, EventSender, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Assembly settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// Resolution recorded for every page
    pub dpi: u32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self { dpi: 100 }
    }
}

/// An ordered page list and where to write it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyJob {
    pub pages: Vec<PathBuf>,
    pub output: PathBuf,
}

/// What a successful job produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub pages: usize,
    pub skipped: Vec<PathBuf>,
}

pub struct DocumentAssembler {
    config: AssemblyConfig,
}

impl DocumentAssembler {
    pub fn new(config: AssemblyConfig) -> Self {
        Self { config }
    }

    pub fn assemble(
        &self,
        job: &AssemblyJob,
        events: &EventSender,
    ) -> Result<AssemblyReport, AssemblyError> {
        let Some((cover, rest)) = job.pages.split_first() else {
            events.log(LogLevel::Error, "No images left to put into the PDF.");
            return Err(AssemblyError::EmptySelection);
        };

        info!(pages = job.pages.len(), output = %job.output.display(), "Assembling document");
        events.send(Event::Assembly(AssemblyEvent::Started {
            pages: job.pages.len(),
        }));
        events.info(format!(
            "--- Generating PDF with {} images ---",
            job.pages.len()
        ));

        let mut builder = PdfBuilder::new(self.config.dpi);

        events.info(format!("Adding cover: {}", display_name(cover)));
        let cover_image = FastDecoder::decode_rgb(cover).map_err(|e| {
            events.log(LogLevel::Error, format!("Cover page failed: {}", e));
            AssemblyError::CoverPage { source: e }
        })?;
        builder.add_page(&cover_image)?;
        drop(cover_image);
        self.page_added(events, cover, 1);

        let mut skipped = Vec::new();
        for path in rest {
            match FastDecoder::decode_rgb(path) {
                Ok(image) => {
                    events.info(format!("Adding page: {}", display_name(path)));
                    builder.add_page(&image)?;
                    self.page_added(events, path, builder.page_count());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping page");
                    events.warn(format!(
                        "Warning: skipping image that could not be opened '{}': {}",
                        display_name(path),
                        e
                    ));
                    events.send(Event::Assembly(AssemblyEvent::PageSkipped {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                    skipped.push(path.clone());
                }
            }
        }

        let pages = builder.page_count();
        builder.write(&job.output)?;

        info!(pages, output = %job.output.display(), "Document written");
        events.info("PDF created successfully!");
        events.send(Event::Assembly(AssemblyEvent::Completed {
            output: job.output.clone(),
            pages,
        }));

        Ok(AssemblyReport {
            output: job.output.clone(),
            pages,
            skipped,
        })
    }

    fn page_added(&self, events: &EventSender, path: &Path, page: usize) {
        events.send(Event::Assembly(AssemblyEvent::PageAdded {
            path: path.to_path_buf(),
            page,
        }));
    }
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new(AssemblyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use lopdf::Document;
    use std::fs;
    use tempfile::TempDir;

    fn write_page(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_pixel(16, 9, Rgb([40, 90, 160])).save(&path).unwrap();
        path
    }

    fn page_count(path: &Path) -> usize {
        Document::load(path).unwrap().get_pages().len()
    }

    #[test]
    fn empty_selection_fails_without_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("deck.pdf");
        let job = AssemblyJob {
            pages: vec![],
            output: output.clone(),
        };

        let err = DocumentAssembler::default().assemble(&job, &null_sender()).unwrap_err();

        assert!(matches!(err, AssemblyError::EmptySelection));
        assert!(!output.exists());
    }

    #[test]
    fn all_pages_are_written_in_order() {
        let dir = TempDir::new().unwrap();
        let pages = vec![write_page(&dir, "1.png"), write_page(&dir, "2.png"), write_page(&dir, "3.png")];
        let output = dir.path().join("deck.pdf");

        let report = DocumentAssembler::default()
            .assemble(&AssemblyJob { pages, output: output.clone() }, &null_sender())
            .unwrap();

        assert_eq!(report.pages, 3);
        assert!(report.skipped.is_empty());
        assert_eq!(page_count(&output), 3);
    }

    #[test]
    fn broken_middle_page_is_skipped() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("2.png");
        fs::write(&broken, b"not an image").unwrap();
        let pages = vec![write_page(&dir, "1.png"), broken.clone(), write_page(&dir, "3.png")];
        let output = dir.path().join("deck.pdf");

        let report = DocumentAssembler::default()
            .assemble(&AssemblyJob { pages, output: output.clone() }, &null_sender())
            .unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.skipped, vec![broken]);
        assert_eq!(page_count(&output), 2);
    }

    #[test]
    fn broken_cover_fails_the_job() {
        let dir = TempDir::new().unwrap();
        let cover = dir.path().join("1.png");
        fs::write(&cover, b"not an image").unwrap();
        let output = dir.path().join("deck.pdf");
        let job = AssemblyJob {
            pages: vec![cover, write_page(&dir, "2.png")],
            output: output.clone(),
        };

        let err = DocumentAssembler::default().assemble(&job, &null_sender()).unwrap_err();

        assert!(matches!(err, AssemblyError::CoverPage { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn cover_only_job_succeeds() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("2.png");
        fs::write(&broken, b"junk").unwrap();
        let output = dir.path().join("deck.pdf");

        let report = DocumentAssembler::default()
            .assemble(
                &AssemblyJob {
                    pages: vec![write_page(&dir, "1.png"), broken],
                    output: output.clone(),
                },
                &null_sender(),
            )
            .unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(page_count(&output), 1);
    }

    #[test]
    fn existing_output_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("deck.pdf");
        fs::write(&output, b"stale").unwrap();

        DocumentAssembler::default()
            .assemble(
                &AssemblyJob {
                    pages: vec![write_page(&dir, "1.png")],
                    output: output.clone(),
                },
                &null_sender(),
            )
            .unwrap();

        assert_eq!(page_count(&output), 1);
    }

    #[test]
    fn transparent_pages_are_flattened_to_rgb() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alpha.png");
        RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 128])).save(&path).unwrap();
        let output = dir.path().join("deck.pdf");

        let report = DocumentAssembler::default()
            .assemble(&AssemblyJob { pages: vec![path], output: output.clone() }, &null_sender())
            .unwrap();

        assert_eq!(report.pages, 1);
    }
}
