//! # Slide Curator
//!
//! Turns a folder of captured slide images into one ordered PDF.
//!
//! ## Workflow
//! - **Load** - list the folder in natural order and decode thumbnails
//! - **Filter** - drop frames with (or without) a watermark and collapse
//!   runs of near-identical frames
//! - **Review** - toggle, reset or bulk-select items
//! - **Assemble** - write the selected images as PDF pages, in order
//!
//! ## Architecture
//! - `core` - The curation engine (GUI-agnostic)
//! - `events` - Event-driven progress and log reporting
//! - `error` - Typed errors for every component
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CuratorError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
