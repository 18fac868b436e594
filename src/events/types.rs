//! Event type definitions for progress reporting.

use crate::core::catalog::Thumbnail;
use crate::core::orchestrator::{TaskKind, TaskOutcome};
use crate::core::selection::{ItemState, SelectionStats};
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// All events emitted by the curation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Folder loading events
    Catalog(CatalogEvent),
    /// Watermark detection events
    Watermark(WatermarkEvent),
    /// Frame deduplication events
    Dedup(DedupEvent),
    /// Document assembly events
    Assembly(AssemblyEvent),
    /// Item state changes, emitted by the foreground only
    Selection(SelectionEvent),
    /// Task lifecycle events
    Task(TaskEvent),
    /// Human-readable log line
    Log(LogLine),
}

/// Events while loading a folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CatalogEvent {
    /// Loading has started
    Started { folder: PathBuf },
    /// The folder was listed; identities in natural order
    Listed { items: Vec<PathBuf> },
    /// One item's pixels were decoded
    ThumbnailDecoded { path: PathBuf, thumbnail: Thumbnail },
    /// One item could not be decoded and was skipped
    DecodeFailed { path: PathBuf, message: String },
    /// The decode pass is over
    Finished {
        total: usize,
        decoded: usize,
        cancelled: bool,
    },
}

/// Events during watermark detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WatermarkEvent {
    Started {
        candidates: usize,
        threshold: f32,
        invert: bool,
    },
    /// A candidate was matched and a decision taken
    Decision {
        path: PathBuf,
        score: f32,
        found: bool,
        excluded: bool,
    },
    /// A candidate could not be matched and was excluded (fail-closed)
    Failed { path: PathBuf, message: String },
    Completed { excluded: usize },
}

/// Events during frame deduplication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DedupEvent {
    Started { candidates: usize, threshold: u32 },
    /// A consecutive pair was compared
    Compared {
        previous: PathBuf,
        current: PathBuf,
        distance: u32,
        similar: bool,
    },
    /// A consecutive pair could not be compared
    Skipped {
        previous: PathBuf,
        current: PathBuf,
        message: String,
    },
    Completed { excluded: usize },
}

/// Events during document assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssemblyEvent {
    Started { pages: usize },
    PageAdded { path: PathBuf, page: usize },
    PageSkipped { path: PathBuf, message: String },
    Completed { output: PathBuf, pages: usize },
}

/// Item state changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectionEvent {
    StateChanged { path: PathBuf, state: ItemState },
    StatsChanged(SelectionStats),
}

/// Task lifecycle. Every `Started` is followed by exactly one
/// `Completed` or `Failed` with the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEvent {
    Started { id: Uuid, kind: TaskKind },
    Completed { id: Uuid, outcome: TaskOutcome },
    Failed {
        id: Uuid,
        kind: TaskKind,
        error: ErrorKind,
        message: String,
    },
}

impl TaskEvent {
    pub fn id(&self) -> Uuid {
        match self {
            TaskEvent::Started { id, .. }
            | TaskEvent::Completed { id, .. }
            | TaskEvent::Failed { id, .. } => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Started { .. })
    }
}

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// A human-readable progress message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}
