//! Pluggable payload compression for the binary envelope.
//!
//! The encoded IR payload may be compressed before it is framed. Each
//! algorithm is identified by the ID stored in the envelope flag byte;
//! ID 0 is reserved for pass-through.

use std::borrow::Cow;

use crate::error::{Result, StasisError};

/// Interface for compression algorithms.
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// The unique ID stored in the envelope flag byte (bits 1-3).
    /// 0 is reserved for No-Compression.
    fn id(&self) -> u8;

    /// Compresses the data.
    ///
    /// Returns a `Cow<[u8]>` which may borrow the input when no
    /// transformation is performed.
    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;

    /// Decompresses the data.
    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;
}

/// Pass-through (ID 0). The default strategy.
#[derive(Debug, Clone, Copy)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn id(&self) -> u8 {
        0
    }

    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }

    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }
}

/// LZ4 (ID 1). Available when the `lz4_flex` feature is enabled.
#[cfg(feature = "lz4_flex")]
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor;

#[cfg(feature = "lz4_flex")]
impl Compressor for Lz4Compressor {
    fn id(&self) -> u8 {
        1
    }

    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Owned(lz4_flex::compress_prepend_size(data)))
    }

    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let vec = lz4_flex::decompress_size_prepended(data)
            .map_err(|e| StasisError::Compression(e.to_string()))?;
        Ok(Cow::Owned(vec))
    }
}

/// Resolves an algorithm ID to its compressor.
///
/// # Errors
/// Returns `StasisError::Compression` when the ID is unknown or its feature
/// is not enabled.
pub(crate) fn for_id(id: u8) -> Result<&'static dyn Compressor> {
    match id {
        0 => Ok(&NoCompression),
        #[cfg(feature = "lz4_flex")]
        1 => Ok(&Lz4Compressor),
        other => Err(StasisError::Compression(format!(
            "Algorithm ID {other} is not registered or available"
        ))),
    }
}
