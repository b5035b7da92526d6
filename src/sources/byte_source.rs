use bytes::Bytes;

use crate::error::{Error, Result};

/// Random-access reads over an immutable byte range of fixed length.
///
/// This is the only I/O seam of the crate. Anything that can hand back a
/// requested range (a local file, a buffer, a suffix fetched from object
/// storage) can be read. Implementations must return
/// [`Error::TruncatedFile`] rather than short data when a range is not
/// available.
pub trait ByteSource {
    /// Full length of the underlying object, including bytes this source
    /// may not be able to serve.
    fn len(&self) -> u64;

    /// Read exactly `length` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, length: u64) -> Result<Bytes>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_at(&mut self, offset: u64, length: u64) -> Result<Bytes> {
        (**self).read_at(offset, length)
    }
}

impl ByteSource for Bytes {
    fn len(&self) -> u64 {
        Bytes::len(self) as u64
    }

    fn read_at(&mut self, offset: u64, length: u64) -> Result<Bytes> {
        let end = checked_end(offset, length)?;
        let available = Bytes::len(self) as u64;
        if end > available {
            return Err(Error::TruncatedFile {
                offset,
                end,
                available,
            });
        }
        // both bounds fit in `available`, which came from a usize
        #[allow(clippy::cast_possible_truncation)]
        Ok(self.slice(offset as usize..end as usize))
    }
}

/// `offset + length`, or `TruncatedFile` when that cannot be addressed at all.
pub(crate) fn checked_end(offset: u64, length: u64) -> Result<u64> {
    offset.checked_add(length).ok_or(Error::TruncatedFile {
        offset,
        end: u64::MAX,
        available: 0,
    })
}
