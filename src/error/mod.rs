//! # Error Module
//!
//! Error types for the slide curator.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, values, what went wrong
//! - **Per-item vs per-task** - item errors are reported and skipped by the
//!   component that hit them; only task-level errors reach [`CuratorError`]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("File system error: {0}")]
    FileSystem(#[from] CatalogError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Comparison error: {0}")]
    Comparison(#[from] ComparisonError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CuratorError {
    /// Coarse classification used in terminal task events
    pub fn kind(&self) -> ErrorKind {
        match self {
            CuratorError::FileSystem(_) => ErrorKind::FileSystemError,
            CuratorError::Decode(_) => ErrorKind::DecodeError,
            CuratorError::Comparison(_) => ErrorKind::ComparisonError,
            CuratorError::Assembly(AssemblyError::EmptySelection) => ErrorKind::EmptySelection,
            CuratorError::Assembly(AssemblyError::CoverPage { .. }) => ErrorKind::DecodeError,
            CuratorError::Assembly(_) => ErrorKind::FileSystemError,
            CuratorError::Task(TaskError::Busy { .. }) => ErrorKind::Busy,
            CuratorError::Task(TaskError::InternalFault { .. }) => ErrorKind::InternalTaskFault,
            CuratorError::Task(TaskError::Failed { kind, .. }) => *kind,
            CuratorError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Error kinds as seen by consumers of the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    FileSystemError,
    DecodeError,
    ComparisonError,
    EmptySelection,
    InternalTaskFault,
    Busy,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::FileSystemError => "FileSystemError",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::ComparisonError => "ComparisonError",
            ErrorKind::EmptySelection => "EmptySelection",
            ErrorKind::InternalTaskFault => "InternalTaskFault",
            ErrorKind::Busy => "Busy",
            ErrorKind::Config => "Config",
        };
        f.write_str(name)
    }
}

/// Errors that occur while loading a folder into the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Folder not found: {path}")]
    FolderNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read folder {path}: {source}")]
    ReadFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while decoding an image file
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Undecodable { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },
}

impl DecodeError {
    /// The file this error refers to
    pub fn path(&self) -> &PathBuf {
        match self {
            DecodeError::Io { path, .. }
            | DecodeError::Undecodable { path, .. }
            | DecodeError::EmptyImage { path } => path,
        }
    }
}

/// Errors that occur while matching or hashing a specific item
#[derive(Error, Debug)]
pub enum ComparisonError {
    #[error(
        "Template ({template_width}x{template_height}) is larger than image {path} ({image_width}x{image_height})"
    )]
    TemplateLargerThanImage {
        path: PathBuf,
        template_width: u32,
        template_height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Hash computation failed for {path}: {reason}")]
    HashFailed { path: PathBuf, reason: String },

    #[error("Invalid watermark threshold: {value} (must be 0.10-1.00)")]
    InvalidWatermarkThreshold { value: f32 },

    #[error("Invalid hash threshold: {value} (must be 0-{max})")]
    InvalidHashThreshold { value: u32, max: u32 },
}

/// Errors that occur while writing the output document
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("No images selected, nothing to assemble")]
    EmptySelection,

    #[error("Cover page could not be decoded: {source}")]
    CoverPage {
        #[source]
        source: DecodeError,
    },

    #[error("Failed to write document {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode document: {0}")]
    Encode(String),
}

/// Errors raised by the task orchestrator itself
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("A {active} task is already running")]
    Busy { active: String },

    #[error("Task {task} failed unexpectedly: {message}")]
    InternalFault { task: String, message: String },

    /// A background task reported failure through its terminal event
    #[error("Task {task} failed: {message}")]
    Failed {
        task: String,
        kind: ErrorKind,
        message: String,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CuratorError>;
