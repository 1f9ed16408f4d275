//! Column discovery policies.
//!
//! A policy decides, from the header name alone, whether a column carries
//! identifiers. [`HeuristicPolicy`] is the default name heuristic; callers
//! with a stricter idea of their schema can use [`PatternPolicy`] or any
//! closure `Fn(&str) -> ColumnRole`.

use regex::Regex;
use serde::{Deserialize, Serialize};

use skumap_shared::{Result, SkuMapError, SweepConfig};

/// Name of the primary identifier column under the default heuristic.
pub const PRIMARY_COLUMN: &str = "SKU";

/// How a column takes part in a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    /// The main identifier column; derives `MSKU`.
    Primary,
    /// Any other identifier column; derives `<name>_MSKU`.
    Secondary,
    /// Not an identifier column.
    Ignored,
}

/// Trait for column discovery.
pub trait ColumnPolicy: Send + Sync {
    /// Classify a column by its header name.
    fn classify(&self, name: &str) -> ColumnRole;

    /// Human-readable policy name for tracing.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> ColumnPolicy for F
where
    F: Fn(&str) -> ColumnRole + Send + Sync,
{
    fn classify(&self, name: &str) -> ColumnRole {
        self(name)
    }
}

// ---------------------------------------------------------------------------
// HeuristicPolicy
// ---------------------------------------------------------------------------

/// Exactly `SKU` is primary; any other name containing `sku` in any case is
/// secondary. False positives such as `Skull_Count` are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPolicy;

impl ColumnPolicy for HeuristicPolicy {
    fn classify(&self, name: &str) -> ColumnRole {
        if name == PRIMARY_COLUMN {
            ColumnRole::Primary
        } else if name.to_lowercase().contains("sku") {
            ColumnRole::Secondary
        } else {
            ColumnRole::Ignored
        }
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

// ---------------------------------------------------------------------------
// PatternPolicy
// ---------------------------------------------------------------------------

/// Exact primary name plus a regex for secondary columns.
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    primary: String,
    secondary: Regex,
}

impl PatternPolicy {
    pub fn new(primary: impl Into<String>, secondary_pattern: &str) -> Result<Self> {
        let secondary = Regex::new(secondary_pattern).map_err(|e| {
            SkuMapError::config(format!("invalid column pattern '{secondary_pattern}': {e}"))
        })?;
        Ok(Self {
            primary: primary.into(),
            secondary,
        })
    }
}

impl ColumnPolicy for PatternPolicy {
    fn classify(&self, name: &str) -> ColumnRole {
        if name == self.primary {
            ColumnRole::Primary
        } else if self.secondary.is_match(name) {
            ColumnRole::Secondary
        } else {
            ColumnRole::Ignored
        }
    }

    fn name(&self) -> &str {
        "pattern"
    }
}

/// Build the policy described by a `[sweep]` config section.
///
/// With no `secondary_pattern` and the default primary name this is
/// [`HeuristicPolicy`]; a custom primary name keeps the case-insensitive
/// `sku` rule for secondaries.
pub fn policy_from_config(config: &SweepConfig) -> Result<Box<dyn ColumnPolicy>> {
    match (&config.secondary_pattern, config.primary_column.as_str()) {
        (None, PRIMARY_COLUMN) => Ok(Box::new(HeuristicPolicy)),
        (None, primary) => Ok(Box::new(PatternPolicy::new(primary, "(?i)sku")?)),
        (Some(pattern), primary) => Ok(Box::new(PatternPolicy::new(primary, pattern)?)),
    }
}
