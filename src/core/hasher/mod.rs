//! # Hasher Module
//!
//! Perceptual hashes (pHash) for frame deduplication.
//!
//! ## How It Works
//! 1. Convert to grayscale and shrink
//! 2. Take the DCT and keep the low-frequency corner
//! 3. Set each bit by comparing its coefficient to the median
//! 4. Compare hashes by Hamming distance
//!
//! ## Example
//! ```rust,ignore
//! let hasher = HasherConfig::new().hash_size(8).build();
//! let distance = hasher.hash_file(&a)?.distance(&hasher.hash_file(&b)?);
//! ```

mod perceptual;
mod traits;

pub use perceptual::PerceptualHasher;
pub use traits::{HashAlgorithm, ImageHashValue, PerceptualHash};

/// Configuration builder for hashers
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Hash side length; the hash has `hash_size * hash_size` bits
    hash_size: u32,
}

impl HasherConfig {
    /// Defaults to an 8x8 (64-bit) hash
    pub fn new() -> Self {
        Self { hash_size: 8 }
    }

    /// Set the hash side length (8 gives 64 bits, 16 gives 256 bits)
    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size.max(2);
        self
    }

    /// Number of bits in hashes produced by this configuration
    pub fn bit_count(&self) -> u32 {
        self.hash_size * self.hash_size
    }

    pub fn build(self) -> PerceptualHasher {
        PerceptualHasher::new(self.hash_size)
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}
