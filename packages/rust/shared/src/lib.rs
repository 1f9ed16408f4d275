//! Shared types, error model, and configuration for skumap.
//!
//! This crate is the foundation depended on by all other skumap crates.
//! It provides:
//! - [`SkuMapError`]: the unified error type
//! - Domain types ([`Dataset`], [`CellValue`], [`SampleRecord`], [`ProcessedFile`])
//! - Configuration ([`AppConfig`], [`SweepConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, SweepConfig, config_dir, config_file_path, database_path,
    init_config, load_config, load_config_from, validate_sweep,
};
pub use error::{Result, SkuMapError};
pub use types::{
    CellValue, Column, Dataset, FileId, MappingRecord, ProcessedFile, ProcessedFileRecord,
    SampleRecord,
};
