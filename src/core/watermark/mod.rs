//! # Watermark Module
//!
//! Decides, per candidate image, whether a reference watermark is present
//! and which candidates to exclude.
//!
//! - `invert = false`: keep images that contain the watermark, exclude
//!   the rest
//! - `invert = true`: keep images without the watermark, exclude the rest
//!
//! Candidates that cannot be decoded or matched are always excluded.

mod matcher;

pub use matcher::{best_match, MatchScore, Template};

use crate::core::decode::FastDecoder;
use crate::core::orchestrator::DetectionResult;
use crate::core::ordering::display_name;
use crate::error::{ComparisonError, CuratorError};
use crate::events::{Event, EventSender, WatermarkEvent};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lowest accepted match threshold
pub const MIN_THRESHOLD: f32 = 0.10;
/// Highest accepted match threshold
pub const MAX_THRESHOLD: f32 = 1.00;

/// Watermark detection settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkConfig {
    /// Minimum correlation for the watermark to count as found
    pub threshold: f32,
    /// Exclude images that DO contain the watermark
    pub invert: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            invert: false,
        }
    }
}

impl WatermarkConfig {
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn validate(&self) -> Result<(), ComparisonError> {
        if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&self.threshold) {
            Ok(())
        } else {
            Err(ComparisonError::InvalidWatermarkThreshold {
                value: self.threshold,
            })
        }
    }

    /// Whether a candidate with this verdict is excluded
    pub fn excludes(&self, found: bool) -> bool {
        found == self.invert
    }
}

/// Template-matching watermark detector
pub struct WatermarkDetector {
    config: WatermarkConfig,
}

impl WatermarkDetector {
    pub fn new(config: WatermarkConfig) -> Result<Self, ComparisonError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load the template at `template_path` and run [`Self::detect`].
    pub fn detect_with_file(
        &self,
        template_path: &Path,
        candidates: &[PathBuf],
        events: &EventSender,
    ) -> Result<DetectionResult, CuratorError> {
        let template = Template::load(template_path).map_err(|e| {
            events.log(
                crate::events::LogLevel::Error,
                format!(
                    "Error: cannot read watermark template '{}': {}",
                    template_path.display(),
                    e
                ),
            );
            e
        })?;
        Ok(self.detect(&template, candidates, events))
    }

    /// Match `template` against each candidate, in order, and collect the
    /// excluded identities.
    pub fn detect(
        &self,
        template: &Template,
        candidates: &[PathBuf],
        events: &EventSender,
    ) -> DetectionResult {
        let WatermarkConfig { threshold, invert } = self.config;

        info!(candidates = candidates.len(), threshold, invert, "Watermark detection started");
        events.send(Event::Watermark(WatermarkEvent::Started {
            candidates: candidates.len(),
            threshold,
            invert,
        }));
        events.info(if invert {
            format!("--- Mode: exclude images WITH the watermark (threshold: {:.2}) ---", threshold)
        } else {
            format!("--- Mode: exclude images WITHOUT the watermark (threshold: {:.2}) ---", threshold)
        });

        let mut result = DetectionResult::default();

        for path in candidates {
            let name = display_name(path);

            let scored = FastDecoder::decode_luma(path)
                .map_err(CuratorError::from)
                .and_then(|image| best_match(path, &image, template).map_err(CuratorError::from));

            match scored {
                Ok(m) => {
                    let found = m.score >= threshold;
                    let excluded = self.config.excludes(found);
                    debug!(path = %path.display(), score = m.score, found, excluded, "Watermark decision");

                    if excluded {
                        result.exclude(path.clone());
                    }

                    let verdict = match (excluded, found) {
                        (true, true) => format!("✓ (excluded) '{}' contains the watermark", name),
                        (true, false) => format!("✗ (excluded) '{}' has no watermark", name),
                        (false, true) => format!("✓ (kept) '{}' contains the watermark", name),
                        (false, false) => format!("✗ (kept) '{}' has no watermark", name),
                    };
                    events.info(format!("{} (match: {:.2})", verdict, m.score));
                    events.send(Event::Watermark(WatermarkEvent::Decision {
                        path: path.clone(),
                        score: m.score,
                        found,
                        excluded,
                    }));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Excluding image that could not be matched");
                    result.exclude(path.clone());
                    events.warn(format!(
                        "Warning: excluding image that could not be processed '{}': {}",
                        name, e
                    ));
                    events.send(Event::Watermark(WatermarkEvent::Failed {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        }

        events.info(format!(
            "Detection finished. {} images added to the exclusion list.",
            result.len()
        ));
        events.send(Event::Watermark(WatermarkEvent::Completed {
            excluded: result.len(),
        }));

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use image::{GrayImage, Luma};
    use std::fs;
    use tempfile::TempDir;

    fn logo() -> GrayImage {
        GrayImage::from_fn(8, 6, |x, y| Luma([if (x * 2 + y) % 5 < 2 { 240 } else { 10 }]))
    }

    fn slide(with_logo: bool, seed: u32) -> GrayImage {
        let mut img = GrayImage::from_fn(48, 32, |x, y| {
            Luma([(x * 2 + y * 2 + seed * 3 + (x * y) % 7 + 20) as u8])
        });
        if with_logo {
            for (x, y, p) in logo().enumerate_pixels() {
                img.put_pixel(36 + x, 22 + y, *p);
            }
        }
        img
    }

    /// Writes `<n>.png` slides; `marks[i]` says whether slide i has the logo
    fn write_slides(dir: &TempDir, marks: &[bool]) -> Vec<PathBuf> {
        marks
            .iter()
            .enumerate()
            .map(|(i, &mark)| {
                let path = dir.path().join(format!("{}.png", i + 1));
                slide(mark, i as u32).save(&path).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn threshold_range_is_enforced() {
        assert!(WatermarkDetector::new(WatermarkConfig::default().threshold(0.05)).is_err());
        assert!(WatermarkDetector::new(WatermarkConfig::default().threshold(1.5)).is_err());
        assert!(WatermarkDetector::new(WatermarkConfig::default().threshold(0.10)).is_ok());
        assert!(WatermarkDetector::new(WatermarkConfig::default().threshold(1.00)).is_ok());
    }

    #[test]
    fn exclusion_rule_follows_invert_flag() {
        let keep_marked = WatermarkConfig::default();
        assert!(!keep_marked.excludes(true));
        assert!(keep_marked.excludes(false));

        let drop_marked = WatermarkConfig::default().invert(true);
        assert!(drop_marked.excludes(true));
        assert!(!drop_marked.excludes(false));
    }

    #[test]
    fn keeps_only_watermarked_images_by_default() {
        let dir = TempDir::new().unwrap();
        let paths = write_slides(&dir, &[true, false, true]);

        let detector = WatermarkDetector::new(WatermarkConfig::default()).unwrap();
        let result = detector.detect(&Template::new(&logo()), &paths, &null_sender());

        assert_eq!(result.excluded, vec![paths[1].clone()]);
    }

    #[test]
    fn inverted_result_is_the_complement_over_decodable_items() {
        let dir = TempDir::new().unwrap();
        let paths = write_slides(&dir, &[true, false, false, true]);
        let template = Template::new(&logo());

        let normal = WatermarkDetector::new(WatermarkConfig::default())
            .unwrap()
            .detect(&template, &paths, &null_sender());
        let inverted = WatermarkDetector::new(WatermarkConfig::default().invert(true))
            .unwrap()
            .detect(&template, &paths, &null_sender());

        for path in &paths {
            assert_ne!(normal.contains(path), inverted.contains(path));
        }
    }

    #[test]
    fn undecodable_candidates_are_excluded_in_both_modes() {
        let dir = TempDir::new().unwrap();
        let mut paths = write_slides(&dir, &[true]);
        let broken = dir.path().join("2.png");
        fs::write(&broken, b"garbage").unwrap();
        paths.push(broken.clone());

        for invert in [false, true] {
            let result = WatermarkDetector::new(WatermarkConfig::default().invert(invert))
                .unwrap()
                .detect(&Template::new(&logo()), &paths, &null_sender());
            assert!(result.contains(&broken));
        }
    }

    #[test]
    fn candidates_smaller_than_template_are_excluded() {
        let dir = TempDir::new().unwrap();
        let tiny = dir.path().join("tiny.png");
        GrayImage::from_pixel(3, 3, Luma([0])).save(&tiny).unwrap();

        let result = WatermarkDetector::new(WatermarkConfig::default().invert(true))
            .unwrap()
            .detect(&Template::new(&logo()), &[tiny.clone()], &null_sender());

        assert_eq!(result.excluded, vec![tiny]);
    }

    #[test]
    fn missing_template_is_a_task_error() {
        let detector = WatermarkDetector::new(WatermarkConfig::default()).unwrap();
        let err = detector
            .detect_with_file(Path::new("/nonexistent/logo.png"), &[], &null_sender())
            .unwrap_err();
        assert!(matches!(err, CuratorError::Decode(_)));
    }
}
