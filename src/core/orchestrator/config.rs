//! Session-wide settings and their builder.

use crate::core::assembler::AssemblyConfig;
use crate::core::catalog::ThumbnailConfig;
use crate::core::dedup::DedupConfig;
use crate::core::watermark::WatermarkConfig;
use crate::error::ComparisonError;

/// Settings shared by every task of a curation session
#[derive(Debug, Clone, PartialEq)]
pub struct CuratorConfig {
    /// Default watermark match threshold (0.10-1.00)
    pub watermark_threshold: f32,
    /// Default deduplication Hamming threshold
    pub dedup_threshold: u32,
    /// Perceptual hash side length
    pub hash_size: u32,
    /// Thumbnail bounding box
    pub thumbnail: ThumbnailConfig,
    /// Resolution recorded for document pages
    pub page_dpi: u32,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            watermark_threshold: WatermarkConfig::default().threshold,
            dedup_threshold: DedupConfig::default().threshold,
            hash_size: DedupConfig::default().hash_size,
            thumbnail: ThumbnailConfig::default(),
            page_dpi: AssemblyConfig::default().dpi,
        }
    }
}

impl CuratorConfig {
    pub fn builder() -> CuratorConfigBuilder {
        CuratorConfigBuilder::new()
    }

    pub fn watermark(&self) -> WatermarkConfig {
        WatermarkConfig::default().threshold(self.watermark_threshold)
    }

    pub fn dedup(&self) -> DedupConfig {
        DedupConfig::default()
            .threshold(self.dedup_threshold)
            .hash_size(self.hash_size)
    }

    pub fn assembly(&self) -> AssemblyConfig {
        AssemblyConfig { dpi: self.page_dpi }
    }

    /// Check every threshold against its accepted range
    pub fn validate(&self) -> Result<(), ComparisonError> {
        self.watermark().validate()?;
        self.dedup().validate()
    }
}

/// Builder for [`CuratorConfig`]
#[derive(Debug, Clone, Default)]
pub struct CuratorConfigBuilder {
    config: CuratorConfig,
}

impl CuratorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watermark_threshold(mut self, threshold: f32) -> Self {
        self.config.watermark_threshold = threshold;
        self
    }

    pub fn dedup_threshold(mut self, threshold: u32) -> Self {
        self.config.dedup_threshold = threshold;
        self
    }

    pub fn hash_size(mut self, size: u32) -> Self {
        self.config.hash_size = size;
        self
    }

    /// Set the thumbnail bounding box
    pub fn thumbnail_size(mut self, max_width: u32, max_height: u32) -> Self {
        self.config.thumbnail = ThumbnailConfig {
            max_width,
            max_height,
        };
        self
    }

    pub fn page_dpi(mut self, dpi: u32) -> Self {
        self.config.page_dpi = dpi.max(1);
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<CuratorConfig, ComparisonError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
