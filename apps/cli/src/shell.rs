//! Interactive `skumap shell`.
//!
//! Keeps one [`UploadSession`] alive across commands, so `last` shows the
//! most recent upload and `reload` publishes the config file's current
//! `[mappings]` without restarting.

use std::io::Write;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, eyre};
use tokio::io::{AsyncBufReadExt, BufReader};

use skumap_core::pipeline::{SilentProgress, UploadConfig};
use skumap_core::session::UploadSession;
use skumap_shared::{AppConfig, database_path, validate_sweep};
use skumap_sweep::{SweepOptions, policy_from_config};

use crate::commands::{
    build_resolver, load_app_config, open_storage_or_skip, print_upload, show_resolution,
};

/// One line of shell input.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Empty,
    Process(Vec<PathBuf>),
    Lookup(String),
    Combo(String),
    Last,
    Reload,
    Help,
    Quit,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word {
            "" => Self::Empty,
            "process" | "p" if !rest.is_empty() => {
                Self::Process(rest.split_whitespace().map(PathBuf::from).collect())
            }
            "lookup" | "l" if !rest.is_empty() => Self::Lookup(rest.to_string()),
            "combo" | "c" if !rest.is_empty() => Self::Combo(rest.to_string()),
            "process" | "p" => return Err(eyre!("usage: process <file>...")),
            "lookup" | "l" => return Err(eyre!("usage: lookup <sku>")),
            "combo" | "c" => return Err(eyre!("usage: combo <sku>")),
            "last" => Self::Last,
            "reload" => Self::Reload,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(eyre!("unknown command '{other}', type 'help' for a list")),
        };
        Ok(command)
    }
}

/// Run the shell until `quit` or end of input.
pub(crate) async fn run_shell(
    config: &AppConfig,
    config_path: Option<&Path>,
    no_db: bool,
) -> Result<()> {
    validate_sweep(&config.sweep)?;
    let policy = policy_from_config(&config.sweep)?;
    let sweep = SweepOptions::from(&config.sweep);
    let storage = if no_db {
        None
    } else {
        open_storage_or_skip(&database_path(config)?).await
    };
    let mut session = UploadSession::new(build_resolver(config)?);

    println!("skumap shell. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Quit => break,
            ShellCommand::Help => print_help(),
            ShellCommand::Process(files) => {
                let upload = UploadConfig { files, sweep };
                match session
                    .ingest(&upload, policy.as_ref(), storage.as_ref(), &SilentProgress)
                    .await
                {
                    Ok(result) => print_upload(&result),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            ShellCommand::Lookup(sku) => {
                let resolution = session.resolver().lookup(&sku);
                println!("{sku} -> {}", show_resolution(&resolution));
            }
            ShellCommand::Combo(sku) => {
                let combo = session.resolver().resolve_combo(&sku);
                for part in &combo.parts {
                    println!("{} -> {}", part.token, show_resolution(&part.resolution));
                }
            }
            ShellCommand::Last => match session.latest() {
                Some(result) => print_upload(&result),
                None => println!("No upload in this session yet."),
            },
            ShellCommand::Reload => match reload(&session, config_path) {
                Ok(entries) => println!("Reloaded {entries} mappings."),
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }
    Ok(())
}

/// Re-read the config file and publish its mapping table.
fn reload(session: &UploadSession, config_path: Option<&Path>) -> Result<usize> {
    let config = load_app_config(config_path)?;
    let resolver = session.reload(config.mappings)?;
    Ok(resolver.len())
}

fn prompt() {
    print!("skumap> ");
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("  process <file>...   sweep CSV/XLSX files");
    println!("  lookup <sku>        resolve one SKU");
    println!("  combo <sku>         resolve a combo SKU component by component");
    println!("  last                show the most recent upload of this session");
    println!("  reload              reload [mappings] from the config file");
    println!("  quit                leave the shell");
}
