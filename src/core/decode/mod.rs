//! # Decode Module
//!
//! Image decoding shared by the catalog, the detectors and the assembler.
//!
//! Uses zune-jpeg for JPEG files (1.5-2x faster than the image crate) and
//! falls back to the image crate for PNG and for JPEGs zune rejects.

use crate::error::DecodeError;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Image formats that participate in curation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Other,
}

impl ImageFormat {
    /// Detect format from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some("png") => Self::Png,
            _ => Self::Other,
        }
    }
}

/// Decoder that picks the fastest available backend per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode an image file.
    pub fn decode(path: &Path) -> Result<DynamicImage, DecodeError> {
        let image = match ImageFormat::from_path(path) {
            ImageFormat::Jpeg => Self::decode_jpeg(path).or_else(|_| Self::decode_fallback(path)),
            _ => Self::decode_fallback(path),
        }?;

        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        Ok(image)
    }

    /// Decode and convert to 8-bit grayscale
    pub fn decode_luma(path: &Path) -> Result<GrayImage, DecodeError> {
        Ok(Self::decode(path)?.to_luma8())
    }

    /// Decode and convert to 8-bit RGB (alpha dropped)
    pub fn decode_rgb(path: &Path) -> Result<RgbImage, DecodeError> {
        Ok(Self::decode(path)?.to_rgb8())
    }

    fn decode_jpeg(path: &Path) -> Result<DynamicImage, DecodeError> {
        let file_bytes = fs::read(path).map_err(|e| DecodeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(&file_bytes, options);

        let pixels = decoder.decode().map_err(|e| DecodeError::Undecodable {
            path: path.to_path_buf(),
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| DecodeError::Undecodable {
            path: path.to_path_buf(),
            reason: "Failed to get image info".to_string(),
        })?;

        let width = info.width as u32;
        let height = info.height as u32;
        let buffer_error = || DecodeError::Undecodable {
            path: path.to_path_buf(),
            reason: "Decoded buffer does not match image dimensions".to_string(),
        };

        let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                DynamicImage::ImageLuma8(buffer)
            }
            _ => return Self::decode_fallback(path),
        };

        Ok(image)
    }

    fn decode_fallback(path: &Path) -> Result<DynamicImage, DecodeError> {
        let reader = image::ImageReader::open(path).map_err(|e| DecodeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let reader = reader.with_guessed_format().map_err(|e| DecodeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        reader.decode().map_err(|e| DecodeError::Undecodable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
