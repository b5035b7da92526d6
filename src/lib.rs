//! Read ORC file metadata without decoding row data.
//!
//! ```no_run
//! use orc_metadata::{ReadOptions, read_metadata_from_path};
//!
//! let options = ReadOptions::new().with_schema(true).with_file_statistics(true);
//! let metadata = read_metadata_from_path("data.orc", &options)?;
//! println!("{}", metadata.schema.unwrap());
//! # Ok::<(), orc_metadata::Error>(())
//! ```

pub mod commands;
pub mod error;
pub mod format;
pub mod inspection;
pub mod reader;
pub mod sources;
pub mod utils;

use std::io::{self, IsTerminal};

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum, builder::ValueHint};

pub use error::{Error, ErrorCategory, Result};
pub use format::compression::{CodecSet, CompressionKind};
pub use reader::{FileMetadata, ReadOptions, read_metadata, read_metadata_from_path};
pub use sources::{ByteSource, FileSource, TailBytes};

#[derive(Parser, Debug)]
#[command(version = env!("ORC_METADATA_VERSION"), about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the metadata of an ORC file.
    ///
    /// Examples:
    ///   # Summary and top-level columns
    ///   orc-metadata inspect data.orc
    ///
    ///   # Full schema tree and file statistics
    ///   orc-metadata inspect data.orc --schema --stats
    ///
    ///   # Stripe layout, streams and encodings, as JSON
    ///   orc-metadata inspect data.orc --stripes -f json
    ///
    ///   # Only the final 64 KiB of the file are available
    ///   orc-metadata inspect data.orc --tail-bytes 65536
    #[command(verbatim_doc_comment)]
    Inspect(InspectArgs),

    /// Check whether a file is ORC.
    Identify(IdentifyArgs),

    /// List the compression codecs compiled into this build.
    Codecs(CodecsArgs),
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the ORC file
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: Utf8PathBuf,
    /// Show the full schema tree
    #[arg(long)]
    pub schema: bool,
    /// Show file-level column statistics
    #[arg(long)]
    pub stats: bool,
    /// Show per-stripe column statistics
    #[arg(long)]
    pub stripe_stats: bool,
    /// Show per-stripe layout, streams and encodings
    #[arg(long)]
    pub stripes: bool,
    /// Skip decoding stripe footers (streams and encodings)
    #[arg(long)]
    pub no_stripe_footers: bool,
    /// Show per-stripe bloom filters (reads stripe index streams)
    #[arg(long)]
    pub bloom_filters: bool,
    /// Show user metadata from the footer
    #[arg(long)]
    pub metadata: bool,
    /// Fail on format versions newer than this tool understands
    #[arg(long)]
    pub strict_version: bool,
    /// Read only the final N bytes of the file, as a ranged fetch would
    #[arg(long, value_name = "N")]
    pub tail_bytes: Option<u64>,
    /// Output format (auto-detects based on TTY if not specified)
    #[arg(long, short = 'f', value_enum, default_value = "auto")]
    pub format: OutputFormat,
}

impl InspectArgs {
    /// Read options for the sections this invocation renders.
    ///
    /// The summary always needs the schema and the stripe list; everything
    /// else is read only when asked for.
    pub fn read_options(&self) -> ReadOptions {
        let json = self.format.resolves_to_json();
        ReadOptions::new()
            .with_schema(true)
            .with_stripes(true)
            .with_stripe_footers(self.stripes && !self.no_stripe_footers)
            .with_file_statistics(self.stats || json)
            .with_stripe_statistics(self.stripe_stats)
            .with_bloom_filters(self.bloom_filters)
            .with_strict_version(self.strict_version)
    }
}

#[derive(Args, Debug)]
pub struct IdentifyArgs {
    /// Path to the file to identify
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: Utf8PathBuf,
    /// Output format (auto-detects based on TTY if not specified)
    #[arg(long, short = 'f', value_enum, default_value = "auto")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CodecsArgs {
    /// Output format (auto-detects based on TTY if not specified)
    #[arg(long, short = 'f', value_enum, default_value = "auto")]
    pub format: OutputFormat,
}

/// Output format for inspect commands
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Auto-detect: JSON if stdout is not a TTY, otherwise text
    #[default]
    Auto,
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

impl OutputFormat {
    pub fn resolves_to_json(&self) -> bool {
        match self {
            OutputFormat::Auto => !io::stdout().is_terminal(),
            OutputFormat::Text => false,
            OutputFormat::Json => true,
        }
    }
}
