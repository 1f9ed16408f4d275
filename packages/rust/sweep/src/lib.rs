//! Column sweep ingestion for skumap.
//!
//! This crate provides:
//! - [`policy`]: column discovery ([`ColumnPolicy`], [`HeuristicPolicy`], [`PatternPolicy`])
//! - [`sweep()`]: resolve every identifier column of a [`Dataset`](skumap_shared::Dataset)
//! - [`reader`], [`xlsx`]: CSV and XLSX → dataset parsing for uploads

pub mod policy;
pub mod reader;
mod sweep;
pub mod xlsx;

pub use policy::{
    ColumnPolicy, ColumnRole, HeuristicPolicy, PRIMARY_COLUMN, PatternPolicy, policy_from_config,
};
pub use reader::{read_csv, read_csv_path};
pub use sweep::{
    ColumnReport, DERIVED_SUFFIX, PRIMARY_DERIVED_COLUMN, SweepOptions, SweepOutcome, sweep,
};
pub use xlsx::{read_xlsx, read_xlsx_path};
