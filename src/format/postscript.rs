use std::fmt;

use prost::Message;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use super::compression::{CompressionKind, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
use super::proto::{self, decode_message};
use crate::error::{Error, Result};
use crate::sources::ByteSource;

pub const MAGIC: &str = "ORC";

/// Newest file format version this crate knows how to read.
pub const CURRENT_VERSION: FormatVersion = FormatVersion { major: 0, minor: 12 };

/// Files written before the version list existed are 0.11.
const IMPLIED_VERSION: FormatVersion = FormatVersion { major: 0, minor: 11 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which writer bug fixes a file was produced with.
///
/// Later versions are a superset of the fixes in earlier ones, so gates are
/// plain comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WriterVersion(pub u32);

impl WriterVersion {
    pub const ORIGINAL: Self = Self(0);
    /// string statistics are computed on UTF-8 bytes
    pub const HIVE_8732: Self = Self(1);
    pub const HIVE_4243: Self = Self(2);
    pub const HIVE_12055: Self = Self(3);
    pub const HIVE_13083: Self = Self(4);
    pub const ORC_101: Self = Self(5);
    pub const ORC_135: Self = Self(6);
    pub const ORC_517: Self = Self(7);
    pub const ORC_203: Self = Self(8);
    pub const ORC_14: Self = Self(9);

    pub fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "original",
            1 => "HIVE-8732",
            2 => "HIVE-4243",
            3 => "HIVE-12055",
            4 => "HIVE-13083",
            5 => "ORC-101",
            6 => "ORC-135",
            7 => "ORC-517",
            8 => "ORC-203",
            9 => "ORC-14",
            _ => return None,
        })
    }

    pub fn has_trusted_string_min_max(self) -> bool {
        self >= Self::HIVE_8732
    }
}

impl fmt::Display for WriterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "future({})", self.0),
        }
    }
}

impl Serialize for WriterVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The decoded, validated postscript plus where it sits in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTrailer {
    pub file_length: u64,
    pub postscript_length: u8,
    pub compression: CompressionKind,
    pub compression_block_size: u64,
    pub footer_length: u64,
    pub metadata_length: Option<u64>,
    pub version: FormatVersion,
    pub writer_version: WriterVersion,
    pub magic: String,
}

impl FileTrailer {
    /// Offset and length of the footer, which ends where the postscript starts.
    pub fn footer_range(&self) -> (u64, u64) {
        let end = self.file_length - 1 - u64::from(self.postscript_length);
        (end - self.footer_length, self.footer_length)
    }

    /// Offset and length of the metadata section, directly before the footer.
    pub fn metadata_range(&self) -> (u64, u64) {
        let (footer_offset, _) = self.footer_range();
        let len = self.metadata_length.unwrap_or(0);
        (footer_offset - len, len)
    }

    /// Bytes from the start of the metadata section to the end of the file.
    pub fn tail_length(&self) -> u64 {
        self.metadata_length.unwrap_or(0) + self.footer_length + u64::from(self.postscript_length) + 1
    }

    /// `"0.12 with ORC-135"`
    pub fn version_string(&self) -> String {
        format!("{} with {}", self.version, self.writer_version)
    }

    /// Versions past [`CURRENT_VERSION`] are read best-effort unless `strict`.
    pub fn check_version(&self, strict: bool) -> Result<()> {
        if self.version <= CURRENT_VERSION {
            return Ok(());
        }
        if strict {
            return Err(Error::UnsupportedFormatVersion {
                major: self.version.major,
                minor: self.version.minor,
            });
        }
        warn!(
            version = %self.version,
            "file format version is newer than {CURRENT_VERSION}, reading anyway"
        );
        Ok(())
    }
}

/// Locate, decode and validate the postscript at the end of `source`.
///
/// Does not check whether the declared codec is available; that only matters
/// once a compressed section has to be read.
pub fn read_trailer<S: ByteSource>(source: &mut S) -> Result<FileTrailer> {
    let file_length = source.len();
    if file_length == 0 {
        return Err(Error::TruncatedFile {
            offset: 0,
            end: 1,
            available: 0,
        });
    }

    let last = source.read_at(file_length - 1, 1)?;
    let postscript_length = last[0];
    if postscript_length == 0 {
        return Err(Error::MalformedPostscript(
            "postscript length is zero".to_string(),
        ));
    }
    let ps_len = u64::from(postscript_length);
    if ps_len + 1 > file_length {
        return Err(Error::TruncatedFile {
            offset: 0,
            end: ps_len + 1,
            available: file_length,
        });
    }

    let ps_offset = file_length - 1 - ps_len;
    let buf = source.read_at(ps_offset, ps_len)?;
    let ps: proto::PostScript = decode_message(&buf, Error::MalformedPostscript)?;
    debug!(
        offset = ps_offset,
        len = ps_len,
        encoded = ps.encoded_len(),
        "decoded postscript"
    );

    let magic = match ps.magic {
        Some(magic) if magic == MAGIC => magic,
        Some(found) => return Err(Error::BadMagic { found }),
        None => check_header_magic(source)?,
    };

    let raw_kind = ps.compression.unwrap_or(CompressionKind::None as i32);
    let compression = CompressionKind::try_from(raw_kind).map_err(|_| {
        Error::MalformedPostscript(format!("unknown compression kind {raw_kind}"))
    })?;

    let compression_block_size = ps.compression_block_size.unwrap_or(DEFAULT_BLOCK_SIZE);
    if compression != CompressionKind::None
        && !(1..MAX_BLOCK_SIZE).contains(&compression_block_size)
    {
        return Err(Error::MalformedPostscript(format!(
            "compression block size {compression_block_size} is outside 1..{MAX_BLOCK_SIZE}"
        )));
    }

    let version = match ps.version.as_slice() {
        [] => IMPLIED_VERSION,
        &[major, minor] => FormatVersion { major, minor },
        other => {
            return Err(Error::MalformedPostscript(format!(
                "version must have two components, found {}",
                other.len()
            )));
        }
    };

    let footer_length = ps
        .footer_length
        .ok_or_else(|| Error::MalformedPostscript("missing footer length".to_string()))?;

    let trailer = FileTrailer {
        file_length,
        postscript_length,
        compression,
        compression_block_size,
        footer_length,
        metadata_length: ps.metadata_length,
        version,
        writer_version: WriterVersion(ps.writer_version.unwrap_or(0)),
        magic,
    };

    let needed = footer_length
        .checked_add(trailer.metadata_length.unwrap_or(0))
        .and_then(|n| n.checked_add(ps_len + 1))
        .ok_or_else(|| Error::MalformedPostscript("section lengths overflow".to_string()))?;
    if needed > file_length {
        return Err(Error::TruncatedFile {
            offset: 0,
            end: needed,
            available: file_length,
        });
    }

    Ok(trailer)
}

/// Pre-0.12 writers put the magic only at the start of the file.
fn check_header_magic<S: ByteSource>(source: &mut S) -> Result<String> {
    if source.len() < MAGIC.len() as u64 {
        return Err(Error::BadMagic {
            found: String::new(),
        });
    }
    let header = source.read_at(0, MAGIC.len() as u64)?;
    if &header[..] == MAGIC.as_bytes() {
        Ok(MAGIC.to_string())
    } else {
        Err(Error::BadMagic {
            found: String::from_utf8_lossy(&header).into_owned(),
        })
    }
}
