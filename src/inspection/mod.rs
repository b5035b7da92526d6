//! Human-readable and JSON inspection of ORC files.

pub mod identify;
pub mod magic;
pub mod orc;
pub mod render;
pub mod style;

pub use identify::{DetectedFormat, detect_format};
pub use orc::OrcInspector;
