//! Thumbnail generation with SIMD-accelerated resizing.
//!
//! Uses fast_image_resize, which picks AVX2/NEON code paths when available.

use crate::error::DecodeError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A small RGB preview of a catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// Packed RGB8 pixels, row-major
    pub pixels: Vec<u8>,
}

/// Bounding box for thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: 150,
            max_height: 90,
        }
    }
}

impl ThumbnailConfig {
    /// Largest size with the source aspect ratio that fits the box
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = f64::min(
            self.max_width as f64 / width as f64,
            self.max_height as f64 / height as f64,
        );
        let w = ((width as f64 * scale).round() as u32).clamp(1, self.max_width.max(1));
        let h = ((height as f64 * scale).round() as u32).clamp(1, self.max_height.max(1));
        (w, h)
    }
}

/// Reusable thumbnail generator
pub struct Thumbnailer {
    config: ThumbnailConfig,
    resizer: Resizer,
}

impl Thumbnailer {
    pub fn new(config: ThumbnailConfig) -> Self {
        Self {
            config,
            resizer: Resizer::new(),
        }
    }

    /// Scale `image` into the configured box, keeping its aspect ratio.
    pub fn make(&mut self, path: &Path, image: &DynamicImage) -> Result<Thumbnail, DecodeError> {
        let rgb = image.to_rgb8();
        let (src_width, src_height) = rgb.dimensions();

        if src_width == 0 || src_height == 0 {
            return Err(DecodeError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        let (width, height) = self.config.fit(src_width, src_height);
        let resize_error = |reason: String| DecodeError::Undecodable {
            path: path.to_path_buf(),
            reason,
        };

        let src_image =
            Image::from_vec_u8(src_width, src_height, rgb.into_raw(), PixelType::U8x3)
                .map_err(|e| resize_error(format!("Failed to create source image: {}", e)))?;
        let mut dst_image = Image::new(width, height, PixelType::U8x3);

        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| resize_error(format!("Resize failed: {}", e)))?;

        Ok(Thumbnail {
            width,
            height,
            pixels: dst_image.into_vec(),
        })
    }
}

impl Default for Thumbnailer {
    fn default() -> Self {
        Self::new(ThumbnailConfig::default())
    }
}
