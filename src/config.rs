//! List configuration.
//!
//! Defines chunking, compression and cache options shared by the writer and
//! the reader. Every field has a default so partial JSON files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for building and reading a compressed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Pending uncompressed bytes after which the next element starts a new chunk.
    /// Default: 32 KB
    pub chunk_threshold_bytes: usize,

    /// Gzip compression level (0-9).
    /// Default: 6
    pub compression_level: u32,

    /// Decoded chunk cache bounds used by readers.
    pub cache: CacheConfig,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_bytes: 32 * 1024, // 32 KB
            compression_level: 6,
            cache: CacheConfig::default(),
        }
    }
}

/// Bounds for the per-reader chunk cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of decoded chunks kept.
    /// Default: 64
    pub max_chunks: usize,

    /// Maximum decoded bytes kept across all chunks.
    /// Default: 16 MB
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_chunks: 64,
            max_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chunks == 0 {
            return Err(Error::Config("cache.max_chunks must be > 0".to_string()));
        }
        if self.max_bytes == 0 {
            return Err(Error::Config("cache.max_bytes must be > 0".to_string()));
        }
        Ok(())
    }
}

impl ListConfig {
    /// Config with the given chunk threshold and defaults elsewhere.
    pub fn with_threshold(chunk_threshold_bytes: usize) -> Self {
        Self {
            chunk_threshold_bytes,
            ..Self::default()
        }
    }

    /// Load a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let config: ListConfig = serde_json::from_slice(&data)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_threshold_bytes == 0 {
            return Err(Error::Config(
                "chunk_threshold_bytes must be > 0".to_string(),
            ));
        }
        if self.compression_level > 9 {
            return Err(Error::Config(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        self.cache.validate()
    }
}
