//! End-to-end upload pipeline: files → parse → sweep → persist → results.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use skumap_resolver::Resolver;
use skumap_shared::{FileId, Result, SampleRecord, SkuMapError};
use skumap_storage::Storage;
use skumap_sweep::{
    ColumnPolicy, ColumnReport, SweepOptions, SweepOutcome, read_csv, read_xlsx, sweep,
};

/// Configuration for [`process_upload`].
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Files to process, in order.
    pub files: Vec<PathBuf>,
    /// Sample sizes.
    pub sweep: SweepOptions,
}

/// Per-file result of the upload pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub filename: String,
    pub total_rows: usize,
    pub columns_count: usize,
    /// All column names, derived columns included.
    pub columns: Vec<String>,
    /// Ordered sample records (primary first).
    pub samples: Vec<SampleRecord>,
    /// Per-column sweep statistics.
    pub swept: Vec<ColumnReport>,
    /// Whether the file and its samples were stored.
    pub db_saved: bool,
    /// Storage ID when `db_saved` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
}

/// A file that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of the upload pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub files: Vec<FileResult>,
    pub skipped: Vec<SkippedFile>,
    /// Total elapsed time.
    #[serde(skip)]
    pub elapsed: std::time::Duration,
}

impl UploadResult {
    /// One-line summary, e.g. `Successfully processed 2 files: a.csv, b.csv`.
    pub fn message(&self) -> String {
        let names: Vec<&str> = self.files.iter().map(|f| f.filename.as_str()).collect();
        format!(
            "Successfully processed {} files: {}",
            names.len(),
            names.join(", ")
        )
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each file, processed or skipped.
    fn file_processed(&self, filename: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &UploadResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_processed(&self, _filename: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &UploadResult) {}
}

/// Run the upload pipeline over every file in `config`.
///
/// 1. Read and parse each file (CSV or XLSX; other formats are skipped)
/// 2. Sweep identifier columns with `resolver` and `policy`
/// 3. Record the file and its samples in `storage`, if given
///
/// A file that cannot be read or parsed is reported in
/// [`UploadResult::skipped`] and does not stop the others. A storage failure
/// only clears `db_saved`; the computed results are returned unchanged.
#[instrument(skip_all, fields(files = config.files.len(), persist = storage.is_some()))]
pub async fn process_upload(
    config: &UploadConfig,
    resolver: &Resolver,
    policy: &dyn ColumnPolicy,
    storage: Option<&Storage>,
    progress: &dyn ProgressReporter,
) -> Result<UploadResult> {
    if config.files.is_empty() {
        return Err(SkuMapError::validation("no files provided"));
    }

    let start = Instant::now();
    let total = config.files.len();
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for (i, path) in config.files.iter().enumerate() {
        let filename = display_name(path);
        progress.phase(&format!("Processing {filename}"));

        let (outcome, content_hash) = match load_and_sweep(path, resolver, policy, &config.sweep) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                progress.file_processed(&filename, i + 1, total);
                continue;
            }
        };

        let summary = outcome.to_processed_file(&filename, content_hash);

        let file_id = match storage {
            Some(storage) => match storage.record_processed_file(&summary).await {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(filename = %filename, error = %e, "failed to save results to database");
                    None
                }
            },
            None => None,
        };

        info!(
            filename = %filename,
            rows = summary.total_rows,
            samples = summary.samples.len(),
            db_saved = file_id.is_some(),
            "file processed"
        );

        files.push(FileResult {
            filename: summary.filename,
            total_rows: summary.total_rows,
            columns_count: summary.columns_count,
            columns: summary.columns,
            samples: summary.samples,
            swept: outcome.columns,
            db_saved: file_id.is_some(),
            file_id,
        });
        progress.file_processed(&filename, i + 1, total);
    }

    let result = UploadResult {
        files,
        skipped,
        elapsed: start.elapsed(),
    };

    info!(
        processed = result.files.len(),
        skipped = result.skipped.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "upload complete"
    );

    progress.done(&result);
    Ok(result)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read, hash, parse, and sweep one file. Returns the outcome and content hash.
fn load_and_sweep(
    path: &Path,
    resolver: &Resolver,
    policy: &dyn ColumnPolicy,
    options: &SweepOptions,
) -> Result<(SweepOutcome, String)> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !matches!(extension.as_str(), "csv" | "xlsx") {
        return Err(SkuMapError::validation(format!(
            "unsupported file type '.{extension}'"
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| SkuMapError::io(path, e))?;
    let content_hash = compute_hash(&bytes);
    let dataset = match extension.as_str() {
        "xlsx" => read_xlsx(Cursor::new(bytes))?,
        _ => read_csv(bytes.as_slice())?,
    };

    Ok((sweep(dataset, resolver, policy, options), content_hash))
}

/// File name without directories.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use skumap_sweep::HeuristicPolicy;
    use uuid::Uuid;

    fn resolver() -> Resolver {
        Resolver::load([
            ("pen", "cste-pen"),
            ("pen-blue", "cste-pen"),
            ("pen-blue2", "cste-pen-black"),
        ])
        .expect("table")
    }

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skumap_upload_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write temp file");
        path
    }

    fn config(files: Vec<PathBuf>) -> UploadConfig {
        UploadConfig {
            files,
            sweep: SweepOptions::default(),
        }
    }

    #[test]
    fn test_compute_hash() {
        let hash = compute_hash(b"hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn processes_csv_without_storage() {
        let path = write_temp("orders.csv", "SKU,Warehouse_SKU\npen,pen-blue2\nunknown,x\n");
        let result = process_upload(
            &config(vec![path]),
            &resolver(),
            &HeuristicPolicy,
            None,
            &SilentProgress,
        )
        .await
        .expect("upload");

        assert_eq!(result.files.len(), 1);
        let file = &result.files[0];
        assert_eq!(file.filename, "orders.csv");
        assert_eq!(file.total_rows, 2);
        assert_eq!(file.columns_count, 4);
        assert_eq!(
            file.columns,
            vec!["SKU", "Warehouse_SKU", "MSKU", "Warehouse_SKU_MSKU"]
        );
        assert_eq!(file.samples.len(), 4);
        assert!(!file.db_saved);
        assert_eq!(result.message(), "Successfully processed 1 files: orders.csv");
    }

    #[tokio::test]
    async fn unsupported_and_missing_files_are_skipped() {
        let good = write_temp("good.csv", "SKU\npen\n");
        let text = write_temp("notes.txt", "SKU\npen\n");
        let broken = write_temp("sheet.xlsx", "not really a spreadsheet");
        let missing = PathBuf::from("/definitely/not/here.csv");

        let result = process_upload(
            &config(vec![text, good, broken, missing]),
            &resolver(),
            &HeuristicPolicy,
            None,
            &SilentProgress,
        )
        .await
        .expect("upload");

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].filename, "good.csv");
        assert_eq!(result.skipped.len(), 3);
        assert!(result.skipped[0].reason.contains("unsupported file type '.txt'"));
        assert!(result.skipped[1].reason.contains("XLSX"));
        assert!(result.skipped[2].reason.contains("I/O error"));
    }

    #[tokio::test]
    async fn persists_when_storage_given() {
        let db = std::env::temp_dir().join(format!("skumap_pipeline_{}.db", Uuid::now_v7()));
        let storage = Storage::open(&db).await.expect("open db");
        let path = write_temp("stock.csv", "SKU\npen\npen-blue\nzzz\n");

        let result = process_upload(
            &config(vec![path]),
            &resolver(),
            &HeuristicPolicy,
            Some(&storage),
            &SilentProgress,
        )
        .await
        .expect("upload");

        let file = &result.files[0];
        assert!(file.db_saved);
        let id = file.file_id.clone().expect("file id");

        let mappings = storage.mappings_for_file(&id).await.expect("mappings");
        assert_eq!(mappings.len(), 3);
        assert_eq!(mappings[2].original_sku, "zzz");
        assert!(mappings[2].mapped_msku.is_none());

        let stored = storage.get_processed_file(&id).await.unwrap().unwrap();
        assert_eq!(stored.content_hash.len(), 64);
        assert_eq!(stored.columns, vec!["SKU", "MSKU"]);
    }

    #[tokio::test]
    async fn processes_xlsx_upload() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "SKU").expect("header");
        sheet.write_string(0, 1, "Warehouse_SKU").expect("header");
        sheet.write_string(1, 0, "pen-blue").expect("cell");
        sheet.write_string(1, 1, "pen-blue2").expect("cell");
        sheet.write_string(2, 0, "zzz").expect("cell");
        sheet.write_string(2, 1, "pen").expect("cell");
        let bytes = workbook.save_to_buffer().expect("save workbook");

        let dir = std::env::temp_dir().join(format!("skumap_upload_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("stock.xlsx");
        std::fs::write(&path, &bytes).expect("write workbook");

        let result = process_upload(
            &config(vec![path]),
            &resolver(),
            &HeuristicPolicy,
            None,
            &SilentProgress,
        )
        .await
        .expect("upload");

        assert!(result.skipped.is_empty());
        let file = &result.files[0];
        assert_eq!(file.filename, "stock.xlsx");
        assert_eq!(file.total_rows, 2);
        assert_eq!(
            file.columns,
            vec!["SKU", "Warehouse_SKU", "MSKU", "Warehouse_SKU_MSKU"]
        );
        let resolved: Vec<Option<&str>> =
            file.samples.iter().map(|s| s.resolved.as_deref()).collect();
        assert_eq!(
            resolved,
            vec![
                Some("cste-pen"),
                None,
                Some("cste-pen-black"),
                Some("cste-pen")
            ]
        );
    }

    #[tokio::test]
    async fn storage_failure_keeps_results() {
        let db = std::env::temp_dir().join(format!("skumap_pipeline_{}.db", Uuid::now_v7()));
        drop(Storage::open(&db).await.expect("create db"));
        let readonly = Storage::open_readonly(&db).await.expect("open readonly");
        let path = write_temp("stock.csv", "SKU\npen\npen-blue\nzzz\n");

        let result = process_upload(
            &config(vec![path]),
            &resolver(),
            &HeuristicPolicy,
            Some(&readonly),
            &SilentProgress,
        )
        .await
        .expect("upload still succeeds");

        assert!(result.skipped.is_empty());
        let file = &result.files[0];
        assert!(!file.db_saved);
        assert!(file.file_id.is_none());
        assert_eq!(file.total_rows, 3);
        let resolved: Vec<Option<&str>> =
            file.samples.iter().map(|s| s.resolved.as_deref()).collect();
        assert_eq!(resolved, vec![Some("cste-pen"), Some("cste-pen"), None]);
        assert_eq!(readonly.status().await.expect("status").files_processed, 0);
    }

    #[tokio::test]
    async fn empty_file_list_is_rejected() {
        let err = process_upload(
            &config(vec![]),
            &resolver(),
            &HeuristicPolicy,
            None,
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no files provided"));
    }
}
