//! Application configuration for skumap.
//!
//! User config lives at `~/.skumap/skumap.toml`.
//! CLI flags override config file values, which override defaults.
//! The `[mappings]` table is the static SKU → MSKU source the resolver is
//! built from at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkuMapError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "skumap.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".skumap";

/// Default database file name inside the config directory.
const DATABASE_FILE_NAME: &str = "skumap.db";

// ---------------------------------------------------------------------------
// Config structs (matching skumap.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Column sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// SKU → MSKU mapping table.
    #[serde(default = "default_mappings")]
    pub mappings: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            sweep: SweepConfig::default(),
            mappings: default_mappings(),
        }
    }
}

/// Sample mapping table shipped as the default.
fn default_mappings() -> BTreeMap<String, String> {
    [
        ("pen", "cste-pen"),
        ("pen-blue", "cste-pen"),
        ("pen-blue2", "cste-pen-black"),
        ("cste-pen", "cste-pen"),
        ("cste-pen-black", "cste-pen-black"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// `[database]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path. Defaults to `~/.skumap/skumap.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// `[sweep]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Rows sampled from the primary identifier column.
    #[serde(default = "default_primary_sample")]
    pub primary_sample: usize,

    /// Rows sampled from each secondary identifier column.
    #[serde(default = "default_secondary_sample")]
    pub secondary_sample: usize,

    /// Exact name of the primary identifier column.
    #[serde(default = "default_primary_column")]
    pub primary_column: String,

    /// Regex selecting secondary identifier columns. When unset, any column
    /// whose name contains "sku" (case-insensitive) is secondary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_pattern: Option<String>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            primary_sample: default_primary_sample(),
            secondary_sample: default_secondary_sample(),
            primary_column: default_primary_column(),
            secondary_pattern: None,
        }
    }
}

fn default_primary_sample() -> usize {
    5
}
fn default_secondary_sample() -> usize {
    3
}
fn default_primary_column() -> String {
    "SKU".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.skumap/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SkuMapError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.skumap/skumap.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SkuMapError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SkuMapError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SkuMapError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SkuMapError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SkuMapError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the database path: explicit `[database] path` (with `~/` expanded)
/// or `~/.skumap/skumap.db`.
pub fn database_path(config: &AppConfig) -> Result<PathBuf> {
    match config.database.path.as_deref() {
        Some(p) => match p.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir()
                    .ok_or_else(|| SkuMapError::config("could not determine home directory"))?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(p)),
        },
        None => Ok(config_dir()?.join(DATABASE_FILE_NAME)),
    }
}

/// Reject sweep settings that cannot be used.
pub fn validate_sweep(config: &SweepConfig) -> Result<()> {
    if config.primary_column.is_empty() {
        return Err(SkuMapError::config("sweep.primary_column must not be empty"));
    }
    if let Some(pattern) = &config.secondary_pattern {
        regex::Regex::new(pattern).map_err(|e| {
            SkuMapError::config(format!("invalid sweep.secondary_pattern '{pattern}': {e}"))
        })?;
    }
    Ok(())
}
