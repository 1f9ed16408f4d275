//! Column sweep: resolve every identifier column of a dataset.
//!
//! Columns are classified once against the input header. Each identifier
//! column gets a derived companion appended at the end of the dataset
//! (`MSKU` for the primary, `<name>_MSKU` for secondaries) and contributes a
//! short sample of `(original, resolved)` pairs. Existing columns, the row
//! count, and row order are never touched.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use skumap_resolver::{Resolution, Resolver};
use skumap_shared::{CellValue, Dataset, ProcessedFile, SampleRecord, SweepConfig};

use crate::policy::{ColumnPolicy, ColumnRole};

/// Name of the column derived from the primary identifier column.
pub const PRIMARY_DERIVED_COLUMN: &str = "MSKU";

/// Suffix appended to a secondary column's name for its derived column.
pub const DERIVED_SUFFIX: &str = "_MSKU";

/// Sample sizes for a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// Rows sampled from the primary column.
    pub primary_sample: usize,
    /// Rows sampled from each secondary column.
    pub secondary_sample: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            primary_sample: 5,
            secondary_sample: 3,
        }
    }
}

impl From<&SweepConfig> for SweepOptions {
    fn from(config: &SweepConfig) -> Self {
        Self {
            primary_sample: config.primary_sample,
            secondary_sample: config.secondary_sample,
        }
    }
}

/// Per-column statistics from a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub source: String,
    pub derived: String,
    pub role: ColumnRole,
    pub mapped: usize,
    pub unmapped: usize,
}

/// Result of [`sweep`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Input dataset with derived columns appended.
    pub dataset: Dataset,
    /// Primary samples first, then each secondary's samples in column order.
    pub samples: Vec<SampleRecord>,
    /// One report per swept column, in the same order as the samples.
    pub columns: Vec<ColumnReport>,
}

impl SweepOutcome {
    /// `true` if no identifier column was found.
    pub fn is_untouched(&self) -> bool {
        self.columns.is_empty()
    }

    /// Summary handed to the persistence layer.
    pub fn to_processed_file(
        &self,
        filename: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> ProcessedFile {
        ProcessedFile {
            filename: filename.into(),
            content_hash: content_hash.into(),
            total_rows: self.dataset.row_count(),
            columns_count: self.dataset.column_count(),
            columns: self.dataset.column_names(),
            samples: self.samples.clone(),
        }
    }
}

/// Resolve every identifier column of `dataset`.
///
/// Only the first column classified as primary is used as primary; later
/// ones are skipped. Unmapped cells become [`CellValue::Null`] in the derived
/// column. This never fails.
#[instrument(skip_all, fields(rows = dataset.row_count(), columns = dataset.column_count(), policy = policy.name()))]
pub fn sweep(
    mut dataset: Dataset,
    resolver: &Resolver,
    policy: &dyn ColumnPolicy,
    options: &SweepOptions,
) -> SweepOutcome {
    let mut primary: Option<usize> = None;
    let mut secondaries: Vec<usize> = Vec::new();

    for (idx, column) in dataset.columns().iter().enumerate() {
        match policy.classify(&column.name) {
            ColumnRole::Primary if primary.is_none() => primary = Some(idx),
            ColumnRole::Primary => {
                debug!(column = %column.name, "duplicate primary column skipped");
            }
            ColumnRole::Secondary => secondaries.push(idx),
            ColumnRole::Ignored => {}
        }
    }

    let plan = primary
        .map(|idx| (idx, ColumnRole::Primary, options.primary_sample))
        .into_iter()
        .chain(
            secondaries
                .into_iter()
                .map(|idx| (idx, ColumnRole::Secondary, options.secondary_sample)),
        )
        .collect::<Vec<_>>();

    let mut samples = Vec::new();
    let mut columns = Vec::with_capacity(plan.len());

    for (source, role, sample_size) in plan {
        let source_name = dataset.columns()[source].name.clone();
        let derived_name = match role {
            ColumnRole::Primary => PRIMARY_DERIVED_COLUMN.to_string(),
            _ => format!("{source_name}{DERIVED_SUFFIX}"),
        };

        let mut resolutions: Vec<Resolution> = Vec::with_capacity(dataset.row_count());
        dataset.derive_column(source, derived_name.clone(), |_, cell| {
            let resolution = resolver.lookup(&cell.as_token());
            let derived = match &resolution {
                Resolution::Mapped(msku) => CellValue::Text(msku.clone()),
                Resolution::Unmapped => CellValue::Null,
            };
            resolutions.push(resolution);
            derived
        });

        let mapped = resolutions.iter().filter(|r| r.is_mapped()).count();
        let report = ColumnReport {
            source: source_name.clone(),
            derived: derived_name.clone(),
            role,
            mapped,
            unmapped: resolutions.len() - mapped,
        };
        debug!(
            column = %report.source,
            derived = %report.derived,
            mapped = report.mapped,
            unmapped = report.unmapped,
            "column swept"
        );

        samples.extend(
            dataset.columns()[source]
                .cells
                .iter()
                .zip(resolutions)
                .take(sample_size)
                .map(|(original, resolution)| SampleRecord {
                    column: source_name.clone(),
                    derived_column: derived_name.clone(),
                    original: original.clone(),
                    resolved: resolution.into_option(),
                }),
        );
        columns.push(report);
    }

    info!(
        swept = columns.len(),
        samples = samples.len(),
        "sweep complete"
    );

    SweepOutcome {
        dataset,
        samples,
        columns,
    }
}
