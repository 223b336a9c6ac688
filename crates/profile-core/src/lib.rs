#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Re-exported so downstream crates build `FieldMask`/`Empty` messages against
// the exact version used by the generated code.
pub use prost_types;
