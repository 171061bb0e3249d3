//! Shared test utilities for cinematix integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp source/output directories
//! - Stub frame grabbers and analyzers standing in for ffmpeg and the remote service

pub mod harness;
pub mod stubs;

pub use harness::{TestHarness, SOURCE_BYTES};
pub use stubs::*;
