//! skumap CLI. Resolves seller SKUs to canonical MSKUs.
//!
//! Processes CSV and XLSX uploads, annotating every SKU column with its MSKU, and
//! records sample mappings in a local database.

mod commands;
mod shell;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
