//! # Session Module
//!
//! The foreground side of a curation run: owns the catalog and the
//! selection, builds task requests from them, and folds task events back
//! in.
//!
//! ## Example
//! ```rust,ignore
//! let mut session = CurationSession::new(CuratorConfig::default());
//! let id = orchestrator.dispatch(session.load_request(&folder))?;
//! for event in receiver.iter() {
//!     session.handle_event(&event);
//!     // stop once the task with `id` reports a terminal event
//! }
//! ```

use crate::core::assembler::AssemblyJob;
use crate::core::catalog::{Catalog, ImageItem};
use crate::core::orchestrator::{
    CuratorConfig, DetectionRequest, DetectionResult, TaskOutcome, TaskRequest, WatermarkScope,
};
use crate::core::selection::{ItemState, SelectionStateMachine, SelectionStats};
use crate::error::CuratorError;
use crate::events::{CatalogEvent, Event, EventSender, TaskEvent};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Catalog plus selection for one loaded folder
pub struct CurationSession {
    config: CuratorConfig,
    catalog: Catalog,
    selection: SelectionStateMachine,
    loading_folder: Option<PathBuf>,
}

impl CurationSession {
    pub fn new(config: CuratorConfig) -> Self {
        Self {
            config,
            catalog: Catalog::default(),
            selection: SelectionStateMachine::default(),
            loading_folder: None,
        }
    }

    /// Publish selection changes to `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.selection = self.selection.with_events(events);
        self
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionStateMachine {
        &self.selection
    }

    /// Catalog items paired with their state, in natural order
    pub fn items(&self) -> impl Iterator<Item = (&ImageItem, ItemState)> + '_ {
        self.catalog.iter().filter_map(move |item| {
            self.selection
                .state(&item.path)
                .map(|state| (item, state))
        })
    }

    pub fn stats(&self) -> SelectionStats {
        self.selection.stats()
    }

    /// Fold one event from the orchestrator into the session.
    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Catalog(CatalogEvent::Started { folder }) => {
                self.loading_folder = Some(folder.clone());
            }
            Event::Catalog(CatalogEvent::Listed { items }) => {
                self.catalog = match self.loading_folder.take() {
                    Some(folder) => Catalog::for_folder(&folder, items.iter().cloned()),
                    None => Catalog::new(items.iter().cloned()),
                };
                self.selection.replace_items(self.catalog.paths());
                info!(items = self.catalog.len(), "Catalog replaced");
            }
            Event::Catalog(CatalogEvent::ThumbnailDecoded { path, thumbnail }) => {
                if !self.catalog.set_thumbnail(path, thumbnail.clone()) {
                    debug!(path = %path.display(), "Thumbnail for unknown item ignored");
                }
            }
            Event::Task(TaskEvent::Completed {
                outcome: TaskOutcome::Detected { kind, result },
                ..
            }) => {
                let applied = self.apply_exclusions(result);
                info!(%kind, excluded = result.len(), applied, "Detection applied");
            }
            _ => {}
        }
    }

    /// Mark every excluded identity filtered; unknown identities are
    /// ignored.
    pub fn apply_exclusions(&mut self, result: &DetectionResult) -> usize {
        self.selection.apply_exclusions(result)
    }

    pub fn toggle(&mut self, path: &Path) -> Option<ItemState> {
        self.selection.toggle(path)
    }

    pub fn reset_all(&mut self) {
        self.selection.reset_all();
    }

    pub fn select_visible(&mut self) {
        self.selection.select_visible();
    }

    pub fn deselect_all(&mut self) {
        self.selection.deselect_all();
    }

    pub fn load_request(&self, folder: &Path) -> TaskRequest {
        TaskRequest::LoadFolder {
            folder: folder.to_path_buf(),
        }
    }

    /// Build a watermark check over `scope`. A threshold of `None` uses the
    /// session default.
    pub fn watermark_request(
        &self,
        template: &Path,
        scope: WatermarkScope,
        invert: bool,
        threshold: Option<f32>,
    ) -> Result<TaskRequest, CuratorError> {
        self.require_loaded()?;
        if !template.is_file() {
            return Err(CuratorError::Config(format!(
                "Choose a valid watermark template file (got '{}')",
                template.display()
            )));
        }

        let candidates = match scope {
            WatermarkScope::All => self.catalog.paths(),
            WatermarkScope::SelectedOnly => self.selection.selected(),
        };
        if scope == WatermarkScope::SelectedOnly && candidates.is_empty() {
            return Err(CuratorError::Config(
                "No selected images to check for the watermark".to_string(),
            ));
        }

        Ok(TaskRequest::Detect(DetectionRequest::Watermark {
            template: template.to_path_buf(),
            threshold: threshold.unwrap_or(self.config.watermark_threshold),
            scope,
            invert,
            candidates,
        }))
    }

    /// Build a frame deduplication over the current selection.
    pub fn dedup_request(&self, threshold: Option<u32>) -> Result<TaskRequest, CuratorError> {
        self.require_loaded()?;
        Ok(TaskRequest::Detect(DetectionRequest::Deduplicate {
            threshold: threshold.unwrap_or(self.config.dedup_threshold),
            candidates: self.selection.selected(),
        }))
    }

    /// Build an assembly of the current selection, written to `output` or
    /// to `<folder>/<folder name>.pdf`.
    pub fn assemble_request(&self, output: Option<PathBuf>) -> Result<TaskRequest, CuratorError> {
        self.require_loaded()?;
        let output = output
            .or_else(|| self.catalog.default_output_path())
            .ok_or_else(|| CuratorError::Config("Choose an output path for the PDF".to_string()))?;

        Ok(TaskRequest::Assemble(AssemblyJob {
            pages: self.selection.selected(),
            output,
        }))
    }

    fn require_loaded(&self) -> Result<(), CuratorError> {
        if self.catalog.folder().is_none() && self.catalog.is_empty() {
            return Err(CuratorError::Config("Load an image folder first".to_string()));
        }
        Ok(())
    }
}
