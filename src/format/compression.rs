//! Block framing and codec dispatch for compressed ORC sections.
//!
//! Every compressed section is a run of chunks, each preceded by a 3-byte
//! little-endian header holding `length * 2 + is_original`. Original chunks
//! are stored verbatim; the rest go through the file's codec.

use std::fmt;

use bytes::{Bytes, BytesMut};
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::error::{Error, Result};

pub use super::proto::CompressionKind;

/// Used when the postscript omits `compressionBlockSize`.
pub const DEFAULT_BLOCK_SIZE: u64 = 256 * 1024;

/// Chunk lengths are 23 bits wide.
pub const MAX_BLOCK_SIZE: u64 = 1 << 23;

const HEADER_LEN: usize = 3;

impl CompressionKind {
    pub const ALL: [CompressionKind; 6] = [
        CompressionKind::None,
        CompressionKind::Zlib,
        CompressionKind::Snappy,
        CompressionKind::Lzo,
        CompressionKind::Lz4,
        CompressionKind::Zstd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::None => "NONE",
            CompressionKind::Zlib => "ZLIB",
            CompressionKind::Snappy => "SNAPPY",
            CompressionKind::Lzo => "LZO",
            CompressionKind::Lz4 => "LZ4",
            CompressionKind::Zstd => "ZSTD",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as i32)
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of codecs a read may use.
///
/// `NONE` is always a member. Build one with [`CodecSet::linked`] for
/// everything compiled into this build, or start from [`CodecSet::none`] and
/// add codecs explicitly.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CodecSet(u8);

impl CodecSet {
    /// Only uncompressed files.
    pub fn none() -> Self {
        Self(CompressionKind::None.bit())
    }

    /// Every codec enabled through cargo features.
    pub fn linked() -> Self {
        let mut set = Self::none();
        if cfg!(feature = "zlib") {
            set = set.with(CompressionKind::Zlib);
        }
        if cfg!(feature = "snappy") {
            set = set.with(CompressionKind::Snappy);
        }
        if cfg!(feature = "lz4") {
            set = set.with(CompressionKind::Lz4);
        }
        if cfg!(feature = "zstd") {
            set = set.with(CompressionKind::Zstd);
        }
        set
    }

    pub fn with(self, kind: CompressionKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub fn without(self, kind: CompressionKind) -> Self {
        if kind == CompressionKind::None {
            return self;
        }
        Self(self.0 & !kind.bit())
    }

    pub fn contains(self, kind: CompressionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = CompressionKind> {
        CompressionKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl Default for CodecSet {
    fn default() -> Self {
        Self::linked()
    }
}

impl fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for CodecSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Decompresses sections of one file.
#[derive(Debug, Clone, Copy)]
pub struct Decompressor {
    kind: CompressionKind,
    block_size: usize,
    codecs: CodecSet,
}

impl Decompressor {
    pub fn new(kind: CompressionKind, block_size: u64, codecs: CodecSet) -> Self {
        let block_size = usize::try_from(block_size.min(MAX_BLOCK_SIZE)).unwrap_or(usize::MAX);
        Self {
            kind,
            block_size,
            codecs,
        }
    }

    pub fn kind(&self) -> CompressionKind {
        self.kind
    }

    /// Undo block framing and compression of one whole section.
    pub fn decompress(&self, raw: &[u8]) -> Result<Bytes> {
        if self.kind == CompressionKind::None {
            return Ok(Bytes::copy_from_slice(raw));
        }
        if raw.is_empty() {
            return Ok(Bytes::new());
        }
        // a caller may enable a codec this build never linked
        if !self.codecs.contains(self.kind) || !CodecSet::linked().contains(self.kind) {
            return Err(Error::UnsupportedCodec(self.kind));
        }

        let mut out = BytesMut::with_capacity(raw.len().saturating_mul(2));
        let mut pos = 0;
        while pos < raw.len() {
            let Some(header) = raw.get(pos..pos + HEADER_LEN) else {
                return Err(corrupt(pos, "truncated chunk header"));
            };
            let value =
                u32::from(header[0]) | u32::from(header[1]) << 8 | u32::from(header[2]) << 16;
            let is_original = value & 1 == 1;
            let len = (value >> 1) as usize;
            let start = pos + HEADER_LEN;
            let Some(chunk) = raw.get(start..start + len) else {
                return Err(corrupt(
                    pos,
                    format!(
                        "chunk of {len} bytes overruns section ({} bytes left)",
                        raw.len() - start
                    ),
                ));
            };
            trace!(offset = pos, len, is_original, "chunk");

            if is_original {
                if len > self.block_size {
                    return Err(corrupt(
                        pos,
                        format!("original chunk of {len} bytes exceeds block size {}", self.block_size),
                    ));
                }
                out.extend_from_slice(chunk);
            } else {
                let inflated = self.inflate(chunk).map_err(|reason| corrupt(pos, reason))?;
                if inflated.len() > self.block_size {
                    return Err(corrupt(
                        pos,
                        format!(
                            "chunk inflates to {} bytes, more than block size {}",
                            inflated.len(),
                            self.block_size
                        ),
                    ));
                }
                out.extend_from_slice(&inflated);
            }
            pos = start + len;
        }
        Ok(out.freeze())
    }

    fn inflate(&self, chunk: &[u8]) -> std::result::Result<Vec<u8>, String> {
        match self.kind {
            #[cfg(feature = "zlib")]
            CompressionKind::Zlib => {
                use std::io::Read;
                let mut out = Vec::with_capacity(self.block_size.min(chunk.len() * 4));
                // one byte past the limit is enough to detect oversized chunks
                flate2::read::DeflateDecoder::new(chunk)
                    .take(self.block_size as u64 + 1)
                    .read_to_end(&mut out)
                    .map_err(|e| format!("zlib: {e}"))?;
                Ok(out)
            }
            #[cfg(feature = "snappy")]
            CompressionKind::Snappy => {
                let len = snap::raw::decompress_len(chunk).map_err(|e| format!("snappy: {e}"))?;
                if len > self.block_size {
                    return Err(format!(
                        "snappy chunk declares {len} bytes, more than block size {}",
                        self.block_size
                    ));
                }
                snap::raw::Decoder::new()
                    .decompress_vec(chunk)
                    .map_err(|e| format!("snappy: {e}"))
            }
            #[cfg(feature = "lz4")]
            CompressionKind::Lz4 => lz4_flex::block::decompress(chunk, self.block_size)
                .map_err(|e| format!("lz4: {e}")),
            #[cfg(feature = "zstd")]
            CompressionKind::Zstd => {
                zstd::bulk::decompress(chunk, self.block_size).map_err(|e| format!("zstd: {e}"))
            }
            kind => Err(format!("codec {kind} is not compiled into this build")),
        }
    }
}

fn corrupt(offset: usize, reason: impl Into<String>) -> Error {
    Error::CorruptBlock {
        offset,
        reason: reason.into(),
    }
}
