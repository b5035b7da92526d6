use bytes::Bytes;

use super::byte_source::{ByteSource, checked_end};
use crate::error::{Error, Result};

/// The final bytes of an object whose full length is known.
///
/// This is what a ranged suffix fetch (`Range: bytes=-N`) against object
/// storage produces. Offsets are in the coordinates of the full object, so
/// the trailer can be located and validated normally; any read that reaches
/// before the fetched suffix fails with [`Error::TruncatedFile`].
#[derive(Debug, Clone)]
pub struct TailBytes {
    total_len: u64,
    tail: Bytes,
}

impl TailBytes {
    /// Wrap `tail` as the last bytes of an object of `total_len` bytes. If
    /// `tail` is longer than the object, only its final `total_len` bytes are
    /// kept.
    pub fn new(total_len: u64, tail: Bytes) -> Self {
        let tail = match usize::try_from(total_len) {
            Ok(total) if total < tail.len() => tail.slice(tail.len() - total..),
            _ => tail,
        };
        Self { total_len, tail }
    }

    /// Fetch the final `fetch_size` bytes of `source`.
    pub fn fetch<S: ByteSource>(source: &mut S, fetch_size: u64) -> Result<Self> {
        let total_len = source.len();
        let fetch_size = fetch_size.min(total_len);
        let tail = source.read_at(total_len - fetch_size, fetch_size)?;
        Ok(Self { total_len, tail })
    }

    /// First offset (in object coordinates) this source can serve.
    pub fn start(&self) -> u64 {
        self.total_len - self.tail.len() as u64
    }
}

impl ByteSource for TailBytes {
    fn len(&self) -> u64 {
        self.total_len
    }

    fn read_at(&mut self, offset: u64, length: u64) -> Result<Bytes> {
        let end = checked_end(offset, length)?;
        let start = self.start();
        if offset < start || end > self.total_len {
            return Err(Error::TruncatedFile {
                offset,
                end,
                available: self.tail.len() as u64,
            });
        }
        // relative bounds are within `tail`
        #[allow(clippy::cast_possible_truncation)]
        let (lo, hi) = ((offset - start) as usize, (end - start) as usize);
        Ok(self.tail.slice(lo..hi))
    }
}
