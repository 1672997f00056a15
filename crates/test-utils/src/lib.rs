//! Shared test utilities for the bowser workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A scripted in-process backend with per-request gates
//! - Dataset fixtures
//! - Series generators
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, ScriptedBackend};
//! ```

pub mod backend;
pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use backend::*;
pub use fixtures::*;
pub use generators::*;
