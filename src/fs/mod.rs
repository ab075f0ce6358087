//! Filesystem utilities for corral.
//!
//! This module provides safe filesystem operations, particularly atomic writes
//! that are essential for maintaining registry state integrity.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
