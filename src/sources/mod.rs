//! Byte sources the metadata reader can read from.

pub mod byte_source;
pub mod file;
pub mod tail;

pub use byte_source::ByteSource;
pub use file::FileSource;
pub use tail::TailBytes;
