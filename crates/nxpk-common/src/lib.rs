//! Common utilities for NXPK tooling.
//!
//! This crate provides the low-level pieces shared by the NXPK crates:
//!
//! - [`BinaryReader`] - Bounds-checked little-endian reading from byte slices
//! - [`Error`] - Errors raised while reading past the end of a buffer

mod error;
mod reader;

pub use error::{Error, Result};
pub use reader::BinaryReader;
