//! Shared formatting helpers for inspect output.

use std::io::Write;

use anyhow::Result;
use humansize::{BINARY, FormatSizeOptions, format_size};
use num_format::{Locale, ToFormattedString};

use super::style::{dim, header, label};
use crate::format::footer::UserMetadata;

/// Format a byte size for human-readable output.
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, FormatSizeOptions::from(BINARY).decimal_places(1))
}

/// Format a large number with thousands separators.
pub fn format_number(n: u64) -> String {
    n.to_formatted_string(&Locale::en)
}

const MAX_METADATA_DISPLAY_CHARS: usize = 100;

/// Truncate a string for display, adding char count if truncated.
pub fn truncate_for_display(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > MAX_METADATA_DISPLAY_CHARS {
        let truncated: String = value.chars().take(MAX_METADATA_DISPLAY_CHARS).collect();
        format!("{}... ({} chars total)", truncated, char_count)
    } else {
        value.to_string()
    }
}

/// User metadata values are raw bytes; show them as text when they are UTF-8
/// and as hex otherwise.
pub fn format_metadata_value(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => truncate_for_display(text),
        Err(_) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("0x{}", truncate_for_display(&hex))
        }
    }
}

/// Render key-value metadata with a header.
pub fn render_metadata_map(
    out: &mut dyn Write,
    header_text: &str,
    metadata: &[UserMetadata],
) -> Result<()> {
    writeln!(out, "\n{}:", header(header_text))?;
    if metadata.is_empty() {
        writeln!(out, "  {}", dim("(none)"))?;
    } else {
        for item in metadata {
            writeln!(
                out,
                "  {}: {}",
                label(&item.name),
                format_metadata_value(&item.value)
            )?;
        }
    }
    Ok(())
}
