//! Upload pipeline orchestration for skumap.
//!
//! This crate ties together CSV/XLSX parsing, the column sweep, and storage into
//! the end-to-end upload workflow ([`pipeline::process_upload`]). A
//! long-running caller keeps an [`session::UploadSession`], which owns the
//! swappable mapping table and the last-result slot ([`results::ResultStore`]).

pub mod pipeline;
pub mod results;
pub mod session;
