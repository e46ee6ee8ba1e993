//! CLI command implementations.

pub mod common;
pub mod convert;
pub mod edges;
pub mod synth;
pub mod version;
