//! Decoding of the ORC file tail and stripe metadata.

pub mod compression;
pub mod footer;
pub mod postscript;
pub mod proto;
pub mod schema;
pub mod statistics;
pub mod stripe;
