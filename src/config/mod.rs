//! Configuration model for corral.
//!
//! Defines the `Config` struct loaded from the single YAML file passed to
//! `corral serve --config`. Supports forward-compatible YAML parsing (unknown
//! top-level fields are captured rather than rejected), sensible defaults for
//! every field, and validation of the loaded values.

mod model;
mod operations;
pub mod types;

// Re-export public API
pub use model::Config;
pub use types::ProjectDefaults;
