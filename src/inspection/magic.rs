use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use anyhow::Result;

/// Whether the file starts with `expected`.
pub fn magic_bytes_match_start(file: &mut File, expected: &[u8]) -> Result<bool> {
    magic_bytes_match_at(file, SeekFrom::Start(0), expected)
}

/// Whether `expected` sits immediately before the final `skip` bytes.
///
/// ORC keeps its postscript magic in front of the one-byte postscript length,
/// so the trailing check uses `skip = 1`.
pub fn magic_bytes_match_end(file: &mut File, expected: &[u8], skip: u64) -> Result<bool> {
    let needed = expected.len() as u64 + skip;
    if file.metadata()?.len() < needed {
        return Ok(false);
    }

    // converting from u64 to i64 can overflow, so we allow
    // for errors rather than panicking or overflowing
    let back: i64 = needed.try_into()?;
    magic_bytes_match_at(file, SeekFrom::End(-back), expected)
}

fn magic_bytes_match_at(file: &mut File, at: SeekFrom, expected: &[u8]) -> Result<bool> {
    if file.metadata()?.len() < expected.len() as u64 {
        return Ok(false);
    }

    let mut buf = vec![0u8; expected.len()];

    // save original position so we can return to it later
    let start_pos = file.stream_position()?;

    file.seek(at)?;
    file.read_exact(&mut buf)?;

    // return to original position
    file.seek(SeekFrom::Start(start_pos))?;

    Ok(buf == expected)
}
