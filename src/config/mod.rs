// src/config/mod.rs

//! Grid settings and job batch files.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a batch file from disk (`loader.rs`).
//! - Validate dependencies, cycles and thread requests (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{BatchFile, GridSettings, JobConfig, RawBatchFile};
pub use validate::{dependency_order, ensure_jobs_fit};
