use std::{
    fs::File,
    io::{ErrorKind, Read, Seek, SeekFrom},
    path::Path,
};

use bytes::Bytes;

use super::byte_source::{ByteSource, checked_end};
use crate::error::{Error, Result};

/// A local file opened for metadata reads.
///
/// The length is captured once at open time; the file is assumed not to
/// change while it is being read.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }

    pub fn new(file: File) -> Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, length: u64) -> Result<Bytes> {
        let end = checked_end(offset, length)?;
        if end > self.len {
            return Err(Error::TruncatedFile {
                offset,
                end,
                available: self.len,
            });
        }

        let length = usize::try_from(length).map_err(|_| Error::TruncatedFile {
            offset,
            end,
            available: self.len,
        })?;
        let mut buf = vec![0u8; length];
        self.file.seek(SeekFrom::Start(offset))?;
        match self.file.read_exact(&mut buf) {
            Ok(()) => Ok(Bytes::from(buf)),
            // file shrank underneath us
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::TruncatedFile {
                offset,
                end,
                available: self.file.metadata()?.len(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_source_reads_ranges() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, b"hello world").unwrap();

        let mut source = FileSource::open(&path).unwrap();
        assert_eq!(source.len(), 11);
        assert_eq!(&source.read_at(6, 5).unwrap()[..], b"world");
        assert_eq!(&source.read_at(0, 5).unwrap()[..], b"hello");
    }

    #[test]
    fn test_file_source_past_end() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut source = FileSource::open(&path).unwrap();
        let err = source.read_at(1, 10).unwrap_err();
        assert!(matches!(err, Error::TruncatedFile { available: 3, .. }));
    }

    #[test]
    fn test_file_source_missing_file() {
        let err = FileSource::open("/nonexistent/path/file.orc")
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io(_)));
    }
}
