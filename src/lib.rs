//
// lib.rs
// dicom-organizer
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//

// Public surface of the library: each module mirrors a CLI verb or a pipeline stage.
pub mod classify;
pub mod cli;
pub mod config;
pub mod dicom_access;
pub mod error;
pub mod export;
pub mod manifest;
pub mod metadata;
pub mod models;
pub mod organize;
pub mod prune;
pub mod series;
pub mod summary;
pub mod sync;

pub use cli::{run as run_cli, Cli, Commands};
