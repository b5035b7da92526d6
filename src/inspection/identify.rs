//! Format detection for ORC files.

use std::fs::File;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};

use super::{
    magic::{magic_bytes_match_end, magic_bytes_match_start},
    style::{dim, value},
};
use crate::error::Error;
use crate::format::compression::CompressionKind;
use crate::format::postscript::{MAGIC, read_trailer};
use crate::sources::FileSource;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum DetectedFormat {
    Orc {
        version: String,
        compression: CompressionKind,
    },
    Unknown,
}

impl std::fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectedFormat::Orc {
                version,
                compression,
            } => write!(
                f,
                "{} {}",
                value("ORC"),
                dim(format!("({version}, {compression})"))
            ),
            DetectedFormat::Unknown => write!(f, "{}", dim("Unknown")),
        }
    }
}

impl DetectedFormat {
    pub fn to_json(&self) -> Value {
        json!(self)
    }
}

/// Detect whether `path` is an ORC file.
///
/// A file qualifies when it carries either the trailing postscript magic or
/// the leading `ORC` header, and its trailer decodes. I/O failures are
/// returned; anything else that prevents the trailer from decoding means
/// [`DetectedFormat::Unknown`].
pub fn detect_format(path: &Path) -> Result<DetectedFormat> {
    let mut file = File::open(path)?;
    let magic = MAGIC.as_bytes();
    if !magic_bytes_match_end(&mut file, magic, 1)? && !magic_bytes_match_start(&mut file, magic)? {
        return Ok(DetectedFormat::Unknown);
    }

    let mut source = FileSource::new(file)?;
    match read_trailer(&mut source) {
        Ok(trailer) => Ok(DetectedFormat::Orc {
            version: trailer.version_string(),
            compression: trailer.compression,
        }),
        Err(Error::Io(err)) => Err(err.into()),
        Err(_) => Ok(DetectedFormat::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::utils::test_data::TestOrc;

    #[test]
    fn test_detects_orc() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.orc");
        TestOrc::write(&path, &TestOrc::single_row());

        let detected = detect_format(&path).unwrap();
        assert_eq!(
            detected,
            DetectedFormat::Orc {
                version: "0.12 with ORC-135".to_string(),
                compression: CompressionKind::None,
            }
        );
        assert_eq!(detected.to_json()["format"], "orc");
    }

    #[test]
    fn test_text_file_is_unknown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "not an orc file").unwrap();
        assert_eq!(detect_format(&path).unwrap(), DetectedFormat::Unknown);
    }

    #[test]
    fn test_header_only_is_unknown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.orc");
        // header magic but a postscript length pointing past the file
        std::fs::write(&path, b"ORC\x00\x00\x40").unwrap();
        assert_eq!(detect_format(&path).unwrap(), DetectedFormat::Unknown);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(detect_format(Path::new("/nonexistent/path/file.orc")).is_err());
    }
}
