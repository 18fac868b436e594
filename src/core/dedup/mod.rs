//! # Dedup Module
//!
//! Collapses runs of near-identical consecutive frames (slide build
//! animations) to their final frame.
//!
//! Candidates are walked once in natural order. Each frame's pHash is
//! compared with the cached hash of the frame right before it; when the
//! distance is within the threshold the EARLIER frame is excluded. A run
//! of `k` similar frames therefore loses its first `k - 1` frames and
//! keeps the last, most complete one.

use crate::core::hasher::{HashAlgorithm, HasherConfig, ImageHashValue, PerceptualHash};
use crate::core::orchestrator::DetectionResult;
use crate::core::ordering::{display_name, sort_paths_natural};
use crate::error::{ComparisonError, CuratorError};
use crate::events::{DedupEvent, Event, EventSender};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Deduplication settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupConfig {
    /// Largest Hamming distance at which two frames count as the same slide
    pub threshold: u32,
    /// Hash side length (8 = 64-bit hash)
    pub hash_size: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: 15,
            hash_size: 8,
        }
    }
}

impl DedupConfig {
    pub fn threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn hash_size(mut self, hash_size: u32) -> Self {
        self.hash_size = hash_size;
        self
    }

    pub fn validate(&self) -> Result<(), ComparisonError> {
        let max = HasherConfig::new().hash_size(self.hash_size).bit_count();
        if self.threshold > max {
            return Err(ComparisonError::InvalidHashThreshold {
                value: self.threshold,
                max,
            });
        }
        Ok(())
    }
}

/// Source of frame hashes. The default implementation decodes files and
/// computes pHashes; tests substitute fixed hashes.
pub trait FrameHasher: Send + Sync {
    fn hash_frame(&self, path: &Path) -> Result<ImageHashValue, CuratorError>;
}

impl<H: HashAlgorithm> FrameHasher for H {
    fn hash_frame(&self, path: &Path) -> Result<ImageHashValue, CuratorError> {
        self.hash_file(path)
    }
}

/// Consecutive-frame deduplicator
pub struct FrameDeduplicator {
    config: DedupConfig,
    hasher: Box<dyn FrameHasher>,
}

impl FrameDeduplicator {
    pub fn new(config: DedupConfig) -> Result<Self, ComparisonError> {
        config.validate()?;
        let hasher = HasherConfig::new().hash_size(config.hash_size).build();
        Ok(Self {
            config,
            hasher: Box::new(hasher),
        })
    }

    /// Use a custom hash source
    pub fn with_hasher(config: DedupConfig, hasher: Box<dyn FrameHasher>) -> Self {
        Self { config, hasher }
    }

    /// Find the frames to exclude among `candidates` (sorted naturally
    /// before comparing).
    pub fn deduplicate(&self, candidates: &[PathBuf], events: &EventSender) -> DetectionResult {
        let mut frames = candidates.to_vec();
        sort_paths_natural(&mut frames);
        let threshold = self.config.threshold;

        info!(candidates = frames.len(), threshold, "Frame deduplication started");
        events.send(Event::Dedup(DedupEvent::Started {
            candidates: frames.len(),
            threshold,
        }));
        events.info(format!("--- Collapsing animation frames (threshold: {}) ---", threshold));

        let mut result = DetectionResult::default();

        if frames.len() < 2 {
            events.info("At least 2 selected images are needed to compare frames.");
            events.send(Event::Dedup(DedupEvent::Completed { excluded: 0 }));
            return result;
        }

        events.info(format!("Comparing {} selected images...", frames.len()));

        let mut previous_hash = self.hash_logged(&frames[0], events);

        for pair in frames.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            let current_hash = self.hash_logged(current, events);

            match (&previous_hash, &current_hash) {
                (Some(prev), Some(curr)) => {
                    let distance = prev.distance(curr);
                    let similar = distance <= threshold;
                    debug!(previous = %previous.display(), current = %current.display(), distance, similar, "Frames compared");

                    if similar {
                        result.exclude(previous.clone());
                        events.info(format!(
                            "-> '{}' and '{}' are similar (distance: {})",
                            display_name(previous),
                            display_name(current),
                            distance
                        ));
                    } else {
                        events.info(format!(
                            "   '{}' and '{}' differ (distance: {})",
                            display_name(previous),
                            display_name(current),
                            distance
                        ));
                    }

                    events.send(Event::Dedup(DedupEvent::Compared {
                        previous: previous.clone(),
                        current: current.clone(),
                        distance,
                        similar,
                    }));
                }
                _ => {
                    let missing = if previous_hash.is_none() { previous } else { current };
                    let message = format!("no hash available for '{}'", display_name(missing));
                    warn!(previous = %previous.display(), current = %current.display(), "Skipping frame comparison");
                    events.warn(format!("Error while comparing: {}", message));
                    events.send(Event::Dedup(DedupEvent::Skipped {
                        previous: previous.clone(),
                        current: current.clone(),
                        message,
                    }));
                }
            }

            previous_hash = current_hash;
        }

        events.info(format!(
            "Frame collapsing finished. {} images added to the exclusion list.",
            result.len()
        ));
        events.send(Event::Dedup(DedupEvent::Completed {
            excluded: result.len(),
        }));

        result
    }

    fn hash_logged(&self, path: &Path, events: &EventSender) -> Option<ImageHashValue> {
        match self.hasher.hash_frame(path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not hash frame");
                events.warn(format!("Could not process image '{}': {}", display_name(path), e));
                None
            }
        }
    }
}
