//! Typed task requests and results.

use crate::core::assembler::{AssemblyJob, AssemblyReport};
use crate::core::catalog::LoadSummary;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which items a watermark check looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatermarkScope {
    /// Every catalog item
    All,
    /// Only currently selected items
    SelectedOnly,
}

/// A detection to run. Candidates are resolved by the foreground before
/// dispatch and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DetectionRequest {
    Watermark {
        template: PathBuf,
        threshold: f32,
        scope: WatermarkScope,
        invert: bool,
        candidates: Vec<PathBuf>,
    },
    Deduplicate {
        threshold: u32,
        candidates: Vec<PathBuf>,
    },
}

/// Everything the orchestrator can run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskRequest {
    LoadFolder { folder: PathBuf },
    Detect(DetectionRequest),
    Assemble(AssemblyJob),
}

impl TaskRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::LoadFolder { .. } => TaskKind::LoadFolder,
            TaskRequest::Detect(DetectionRequest::Watermark { .. }) => TaskKind::DetectWatermark,
            TaskRequest::Detect(DetectionRequest::Deduplicate { .. }) => TaskKind::Deduplicate,
            TaskRequest::Assemble(_) => TaskKind::AssembleDocument,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    LoadFolder,
    DetectWatermark,
    Deduplicate,
    AssembleDocument,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::LoadFolder => write!(f, "load-folder"),
            TaskKind::DetectWatermark => write!(f, "watermark"),
            TaskKind::Deduplicate => write!(f, "deduplicate"),
            TaskKind::AssembleDocument => write!(f, "assemble"),
        }
    }
}

/// Identities a detector wants filtered, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub excluded: Vec<PathBuf>,
}

impl DetectionResult {
    pub fn from_excluded(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut result = Self::default();
        for path in paths {
            result.exclude(path);
        }
        result
    }

    /// Add an identity once; repeats are ignored
    pub fn exclude(&mut self, path: PathBuf) {
        if !self.contains(&path) {
            self.excluded.push(path);
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.excluded.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }
}

/// Successful result of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Loaded(LoadSummary),
    Detected {
        kind: TaskKind,
        result: DetectionResult,
    },
    Assembled(AssemblyReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_result_ignores_repeats() {
        let result = DetectionResult::from_excluded(vec![
            PathBuf::from("a.png"),
            PathBuf::from("b.png"),
            PathBuf::from("a.png"),
        ]);
        assert_eq!(result.len(), 2);
        assert!(result.contains(Path::new("b.png")));
    }

    #[test]
    fn request_kinds() {
        let request = TaskRequest::Detect(DetectionRequest::Deduplicate {
            threshold: 10,
            candidates: vec![],
        });
        assert_eq!(request.kind(), TaskKind::Deduplicate);
        assert_eq!(request.kind().to_string(), "deduplicate");
    }
}
