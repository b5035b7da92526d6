//! Error types for ORC metadata reads.
//!
//! Every failure inside the crate surfaces as a single [`Error`]. Callers that
//! need to decide what to do with a failed file should look at
//! [`Error::category`]:
//!
//! - [`ErrorCategory::Unsupported`]: this build cannot read the file (a codec
//!   that was not compiled in, or a format version rejected in strict mode).
//!   Usually safe to skip.
//! - [`ErrorCategory::Truncated`]: the byte source ends before the data a
//!   requested facet needs. Usually a partial transfer.
//! - [`ErrorCategory::Corrupt`]: the bytes are there but do not decode.
//! - [`ErrorCategory::Io`]: the byte source itself failed.

use serde::Serialize;
use thiserror::Error;

use crate::format::compression::CompressionKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("truncated file: need bytes {offset}..{end} but only {available} are readable")]
    TruncatedFile {
        offset: u64,
        end: u64,
        available: u64,
    },

    #[error("bad magic: expected \"ORC\", found {found:?}")]
    BadMagic { found: String },

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedFormatVersion { major: u32, minor: u32 },

    #[error("malformed postscript: {0}")]
    MalformedPostscript(String),

    #[error("malformed footer: {0}")]
    MalformedFooter(String),

    #[error("malformed schema: {0}")]
    MalformedSchema(String),

    #[error("malformed statistics for column {column}: {reason}")]
    MalformedStatistics { column: usize, reason: String },

    #[error("stripe statistics count mismatch: footer declares {stripes} stripes, metadata has {statistics}")]
    StripeStatisticsCountMismatch { stripes: usize, statistics: usize },

    #[error("compression codec {0} is not available in this build")]
    UnsupportedCodec(CompressionKind),

    #[error("corrupt compressed block at byte {offset}: {reason}")]
    CorruptBlock { offset: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse grouping of [`Error`] variants for retry/skip decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Unsupported,
    Truncated,
    Corrupt,
    Io,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnsupportedCodec(_) | Error::UnsupportedFormatVersion { .. } => {
                ErrorCategory::Unsupported
            }
            Error::TruncatedFile { .. } => ErrorCategory::Truncated,
            Error::Io(_) => ErrorCategory::Io,
            Error::BadMagic { .. }
            | Error::MalformedPostscript(_)
            | Error::MalformedFooter(_)
            | Error::MalformedSchema(_)
            | Error::MalformedStatistics { .. }
            | Error::StripeStatisticsCountMismatch { .. }
            | Error::CorruptBlock { .. } => ErrorCategory::Corrupt,
        }
    }

    /// True when the file is fine but this build cannot read it.
    pub fn is_skippable(&self) -> bool {
        self.category() == ErrorCategory::Unsupported
    }

    pub(crate) fn statistics(column: usize, reason: impl Into<String>) -> Self {
        Error::MalformedStatistics {
            column,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
