//! Validated SKU → MSKU mapping table.

use std::collections::HashMap;

use tracing::debug;

use skumap_shared::{Result, SkuMapError};

/// Identifier → canonical identifier map.
///
/// Invariants after [`MappingTable::from_entries`]:
/// - no empty keys or values
/// - every canonical value maps to itself
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: HashMap<String, String>,
}

impl MappingTable {
    /// Copy and validate raw `(sku, msku)` pairs.
    ///
    /// Missing `msku → msku` fixed points are added. A canonical value that is
    /// also a key pointing somewhere else is rejected, as is a key listed
    /// twice with different values.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map: HashMap<String, String> = HashMap::new();

        for (sku, msku) in entries {
            let (sku, msku) = (sku.into(), msku.into());
            if sku.is_empty() {
                return Err(SkuMapError::validation("mapping key must not be empty"));
            }
            if msku.is_empty() {
                return Err(SkuMapError::validation(format!(
                    "mapping for '{sku}' has an empty canonical identifier"
                )));
            }
            match map.get(&sku) {
                Some(existing) if *existing != msku => {
                    return Err(SkuMapError::validation(format!(
                        "'{sku}' is mapped to both '{existing}' and '{msku}'"
                    )));
                }
                Some(_) => {}
                None => {
                    map.insert(sku, msku);
                }
            }
        }

        let mut canonicals: Vec<String> = map.values().cloned().collect();
        canonicals.sort();
        canonicals.dedup();

        for canonical in canonicals {
            match map.get(&canonical) {
                Some(target) if *target != canonical => {
                    return Err(SkuMapError::validation(format!(
                        "canonical identifier '{canonical}' is itself mapped to '{target}'"
                    )));
                }
                Some(_) => {}
                None => {
                    debug!(msku = %canonical, "adding canonical fixed point");
                    map.insert(canonical.clone(), canonical);
                }
            }
        }

        Ok(Self { entries: map })
    }

    pub fn get(&self, sku: &str) -> Option<&str> {
        self.entries.get(sku).map(String::as_str)
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.entries.contains_key(sku)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Largest number of `separator`-delimited pieces in any key.
    pub(crate) fn max_pieces(&self, separator: char) -> usize {
        self.entries
            .keys()
            .map(|k| k.matches(separator).count() + 1)
            .max()
            .unwrap_or(1)
    }
}
