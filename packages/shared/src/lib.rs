//! Utilities shared by every Hibiki package.
//!
//! - `logger`: tracing subscriber setup
//! - `time`: clock abstraction and timestamp conversion

pub mod logger;
pub mod time;
