//! The binary envelope framing an encoded IR payload.
//!
//! # Layout
//!
//! ```text
//! [ Magic "STA1" (4) ] [ Version u16 LE (2) ] [ FlagByte (1) ]
//! [ Payload Checksum u64 LE (8) ] [ Payload ... ]
//! ```
//!
//! The payload is the IR tree encoded with bincode's serde bridge, possibly
//! compressed; the flag byte records which algorithm. The checksum is
//! XxHash64 over the stored (post-compression) payload and is verified
//! before any decoding happens.

use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::compression;
use crate::error::{Result, StasisError};
use crate::ir::IrNode;

/// Magic bytes identifying the envelope format.
pub const MAGIC_BYTES: [u8; 4] = *b"STA1";

/// Current envelope version.
pub const FORMAT_VERSION: u16 = 1;

/// Fixed envelope header size.
/// Magic(4) + Version(2) + Flags(1) + Checksum(8) = 15
pub const ENVELOPE_HEADER_SIZE: usize = 15;

/// Configuration flags for the envelope, stored in a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagByte(u8);

impl FlagByte {
    const COMPRESSION_MASK: u8 = 0b0000_1110; // Bits 1-3

    /// Creates a new FlagByte.
    pub fn new(compression_id: u8) -> Self {
        // Compression ID lives in bits 1-3; bit 0 is reserved.
        Self((compression_id & 0x07) << 1)
    }

    /// Decodes the byte.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the compression algorithm ID (0-7).
    pub fn compression_id(&self) -> u8 {
        (self.0 & Self::COMPRESSION_MASK) >> 1
    }

    /// Returns the raw byte representation.
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

fn checksum(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

/// Encodes an IR tree into a framed byte envelope.
pub(crate) fn encode_ir(ir: &IrNode, compression_id: u8) -> Result<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(ir, bincode::config::standard())
        .map_err(|e| StasisError::Codec(e.to_string()))?;

    let compressor = compression::for_id(compression_id)?;
    let stored = compressor.compress(&payload)?;

    let mut buf = Vec::with_capacity(ENVELOPE_HEADER_SIZE + stored.len());
    buf.extend_from_slice(&MAGIC_BYTES);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.push(FlagByte::new(compression_id).as_u8());
    buf.extend_from_slice(&checksum(&stored).to_le_bytes());
    buf.extend_from_slice(&stored);
    Ok(buf)
}

/// Validates and decodes a framed byte envelope back into an IR tree.
pub(crate) fn decode_ir(bytes: &[u8]) -> Result<IrNode> {
    if bytes.len() < ENVELOPE_HEADER_SIZE {
        return Err(StasisError::Format("Input smaller than header".into()));
    }

    let (header, stored) = bytes.split_at(ENVELOPE_HEADER_SIZE);

    if header[0..4] != MAGIC_BYTES {
        return Err(StasisError::Format("Invalid Magic Bytes".into()));
    }

    let version = u16::from_le_bytes(header[4..6].try_into().unwrap_or([0; 2]));
    if version != FORMAT_VERSION {
        return Err(StasisError::Format(format!(
            "Unsupported version: {version}"
        )));
    }

    let flags = FlagByte::from_byte(header[6]);
    let expected = u64::from_le_bytes(header[7..15].try_into().unwrap_or([0; 8]));

    if checksum(stored) != expected {
        return Err(StasisError::Format("Payload checksum mismatch".into()));
    }

    let compressor = compression::for_id(flags.compression_id())?;
    let payload = compressor.decompress(stored)?;

    bincode::serde::decode_from_slice(&payload, bincode::config::standard())
        .map(|(ir, _)| ir)
        .map_err(|e| StasisError::Codec(e.to_string()))
}
