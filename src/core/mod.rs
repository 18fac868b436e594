//! # Core Module
//!
//! The GUI-agnostic curation engine.
//!
//! ## Modules
//! - `ordering` - Natural ("human") file name ordering
//! - `catalog` - The ordered image set of one folder, plus thumbnails
//! - `decode` - Image decoding shared by every component
//! - `hasher` - Perceptual hashes
//! - `watermark` - Template-matching watermark detection
//! - `dedup` - Consecutive near-duplicate frame detection
//! - `selection` - Per-item selected/filtered state
//! - `assembler` - PDF output
//! - `orchestrator` - Single-flight background tasks
//! - `session` - Catalog and selection as seen by a front end

pub mod assembler;
pub mod catalog;
pub mod decode;
pub mod dedup;
pub mod hasher;
pub mod orchestrator;
pub mod ordering;
pub mod selection;
pub mod session;
pub mod watermark;

// Re-export commonly used types
pub use catalog::{Catalog, ImageItem};
pub use orchestrator::{CuratorConfig, TaskOrchestrator, TaskOutcome, TaskRequest};
pub use selection::{ItemState, SelectionStateMachine, SelectionStats};
pub use session::CurationSession;
