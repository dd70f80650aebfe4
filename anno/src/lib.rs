//! A compiler for source annotations.
//!
//! Annotation blocks are `/* ... */` comments containing `@enum`, `@struct`
//! and `@union` directives. Each directive describes a type to generate,
//! modified by `--flag` and `--flag=value` options on the directive itself
//! and on its fields. This crate tokenizes and parses those blocks into
//! resolved descriptors and reports rich diagnostics for malformed input.

pub mod core;
pub mod driver;
pub mod reporting;
pub mod source;
pub mod surface;

pub use driver::{Driver, Status};
