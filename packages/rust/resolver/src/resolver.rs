//! Single and combo SKU resolution.

use serde::{Deserialize, Serialize};
use tracing::warn;

use skumap_shared::Result;

use crate::table::MappingTable;

/// Separator joining the component SKUs of a combo.
pub const COMBO_SEPARATOR: char = '-';

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of a single lookup. `Unmapped` is an ordinary result, not a fault.
///
/// Serializes as the canonical string or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolution {
    Mapped(String),
    Unmapped,
}

impl Resolution {
    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Mapped(msku) => Some(msku),
            Self::Unmapped => None,
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Mapped(msku) => Some(msku),
            Self::Unmapped => None,
        }
    }
}

impl From<Option<&str>> for Resolution {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Unmapped, |s| Self::Mapped(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ComboResolution
// ---------------------------------------------------------------------------

/// One decomposed component of a combo SKU and its resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboPart {
    /// Literal component token.
    pub token: String,
    pub resolution: Resolution,
}

/// Per-component results of a combo lookup, in component order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboResolution {
    pub parts: Vec<ComboPart>,
}

impl ComboResolution {
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Resolutions in component order.
    pub fn resolutions(&self) -> impl Iterator<Item = &Resolution> {
        self.parts.iter().map(|p| &p.resolution)
    }

    /// Canonical identifiers in component order, `None` for unmapped parts.
    pub fn mapped(&self) -> Vec<Option<&str>> {
        self.resolutions().map(Resolution::as_deref).collect()
    }

    pub fn unmapped_count(&self) -> usize {
        self.resolutions().filter(|r| !r.is_mapped()).count()
    }

    /// `true` when every component resolved.
    pub fn is_complete(&self) -> bool {
        self.unmapped_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Read-only SKU resolver over a validated [`MappingTable`].
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    table: MappingTable,
    /// Longest key measured in separator pieces; bounds combo grouping.
    max_pieces: usize,
}

impl Resolver {
    pub fn new(table: MappingTable) -> Self {
        let max_pieces = table.max_pieces(COMBO_SEPARATOR);
        Self { table, max_pieces }
    }

    /// Validate raw `(sku, msku)` pairs and build a resolver from them.
    pub fn load<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Self::new(MappingTable::from_entries(entries)?))
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.table.contains(sku)
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, sku: &str) -> Resolution {
        self.table.get(sku).into()
    }

    /// Decompose `combo` into component tokens.
    ///
    /// The raw separator pieces are grouped left to right: at each position
    /// the longest run of pieces whose joined text is a known key becomes one
    /// component; if no run starting there is known, the single piece is the
    /// component. Components are never split again. Empty pieces (leading,
    /// trailing or doubled separators) come out as empty components.
    pub fn split_combo<'a>(&self, combo: &'a str) -> Vec<&'a str> {
        let mut bounds: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        for (idx, sep) in combo.match_indices(COMBO_SEPARATOR) {
            bounds.push((start, idx));
            start = idx + sep.len();
        }
        bounds.push((start, combo.len()));

        let mut components = Vec::with_capacity(bounds.len());
        let mut i = 0;
        while i < bounds.len() {
            let begin = bounds[i].0;
            let limit = (i + self.max_pieces).min(bounds.len());
            let last = (i..limit)
                .rev()
                .find(|&j| self.table.contains(&combo[begin..bounds[j].1]))
                .unwrap_or(i);
            components.push(&combo[begin..bounds[last].1]);
            i = last + 1;
        }
        components
    }

    /// Resolve every component of a combo SKU, keeping order and duplicates.
    ///
    /// Unmapped components are logged as a warning and returned in place.
    pub fn resolve_combo(&self, combo: &str) -> ComboResolution {
        let parts: Vec<ComboPart> = self
            .split_combo(combo)
            .into_iter()
            .map(|token| ComboPart {
                token: token.to_string(),
                resolution: self.lookup(token),
            })
            .collect();

        let resolution = ComboResolution { parts };
        let unmapped = resolution.unmapped_count();
        if unmapped > 0 {
            warn!(
                combo,
                unmapped,
                components = resolution.len(),
                "some SKUs in the combo are not mapped"
            );
        }
        resolution
    }
}
