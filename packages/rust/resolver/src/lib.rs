//! SKU → MSKU resolution engine.
//!
//! This crate provides:
//! - [`MappingTable`]: validated identifier → canonical identifier map
//! - [`Resolver`]: exact lookups and combo SKU decomposition
//! - [`SharedResolver`]: atomically swappable resolver for long-running callers
//!
//! Nothing here performs I/O, and an unknown identifier is always reported as
//! [`Resolution::Unmapped`], never as an error.

mod resolver;
mod shared;
mod table;

pub use resolver::{COMBO_SEPARATOR, ComboPart, ComboResolution, Resolution, Resolver};
pub use shared::SharedResolver;
pub use table::MappingTable;
