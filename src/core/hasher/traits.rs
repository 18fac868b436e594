//! Trait definitions for perceptual hashing.

use crate::core::decode::FastDecoder;
use crate::error::{ComparisonError, CuratorError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A computed perceptual hash that can be compared
pub trait PerceptualHash: Clone + Send + Sync {
    /// Number of differing bits between two hashes.
    /// Lower distance = more similar images.
    fn distance(&self, other: &Self) -> u32;

    /// Get the raw hash bytes
    fn as_bytes(&self) -> &[u8];

    /// Get the hash as a hexadecimal string
    fn to_hex(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Get the total number of bits in this hash
    fn bit_count(&self) -> u32 {
        (self.as_bytes().len() * 8) as u32
    }
}

/// Trait for hash algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Compute a hash from an already-loaded image
    fn hash_image(&self, path: &Path, image: &DynamicImage)
        -> Result<ImageHashValue, ComparisonError>;

    /// Decode a file and hash it
    fn hash_file(&self, path: &Path) -> Result<ImageHashValue, CuratorError> {
        let image = FastDecoder::decode(path)?;
        Ok(self.hash_image(path, &image)?)
    }
}

/// Concrete hash value type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHashValue {
    bytes: Vec<u8>,
}

impl ImageHashValue {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl PerceptualHash for ImageHashValue {
    fn distance(&self, other: &Self) -> u32 {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
