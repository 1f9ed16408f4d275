//! Core domain types for skumap: tabular cells and datasets, sample
//! records, and processed-file summaries handed to storage.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SkuMapError};

// ---------------------------------------------------------------------------
// FileId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for processed-file identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub Uuid);

impl FileId {
    /// Generate a new time-sortable file identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// CellValue
// ---------------------------------------------------------------------------

/// A single cell of an uploaded table.
///
/// Serialized untagged, so JSON output shows plain `null`, numbers, and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Best-effort string form used as the lookup token.
    ///
    /// Never fails. Non-text cells render the way spreadsheet tooling prints
    /// them (`nan`, `True`, `12.0`), which almost never matches a mapping key.
    pub fn as_token(&self) -> String {
        match self {
            Self::Null => "nan".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => float_token(*f),
            Self::Text(s) => s.clone(),
        }
    }

    /// `true` for [`CellValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text if this is a [`CellValue::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Option<String>> for CellValue {
    fn from(s: Option<String>) -> Self {
        s.map_or(Self::Null, Self::Text)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(""),
            other => f.write_str(&other.as_token()),
        }
    }
}

/// Shortest round-trip form, switching to `1e+16` style outside
/// `1e-4 <= |f| < 1e16` the way Python's float repr does.
fn float_token(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let sci = format!("{f:e}");
    let parts = sci
        .split_once('e')
        .and_then(|(mantissa, exp)| Some((mantissa, exp.parse::<i32>().ok()?)));
    match parts {
        Some((mantissa, exp)) if !(-4..16).contains(&exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        _ if f.fract() == 0.0 => format!("{f:.1}"),
        _ => format!("{f}"),
    }
}

// ---------------------------------------------------------------------------
// Column / Dataset
// ---------------------------------------------------------------------------

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Header name as it appeared in the upload.
    pub name: String,
    /// Cell values in row order.
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Build a text column from string slices.
    pub fn from_strs(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(name, values.iter().map(|v| CellValue::from(*v)).collect())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// An ordered set of equally long, named columns.
///
/// Column names need not be unique; [`Dataset::column`] returns the first
/// column with a given name. Serializes as its list of columns and is
/// deserialized through [`Dataset::from_columns`], so lengths are checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// An empty dataset (no columns, no rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from columns, checking they all have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut dataset = Self::new();
        for column in columns {
            dataset.push_column(column)?;
        }
        Ok(dataset)
    }

    /// Append a column. The first column fixes the row count.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.is_empty() {
            self.row_count = column.len();
        } else if column.len() != self.row_count {
            return Err(SkuMapError::validation(format!(
                "column '{}' has {} rows, dataset has {}",
                column.name,
                column.len(),
                self.row_count
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Append a column computed cell by cell from the column at `source`.
    ///
    /// `f` receives the row index and the source cell. The new column always
    /// has the dataset's row count. Returns the new column's index, or `None`
    /// if `source` is out of range.
    pub fn derive_column<F>(&mut self, source: usize, name: impl Into<String>, mut f: F) -> Option<usize>
    where
        F: FnMut(usize, &CellValue) -> CellValue,
    {
        let cells: Vec<CellValue> = self
            .columns
            .get(source)?
            .cells
            .iter()
            .enumerate()
            .map(|(row, cell)| f(row, cell))
            .collect();
        self.columns.push(Column::new(name, cells));
        Some(self.columns.len() - 1)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// First column named `name`, if any.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

}

impl TryFrom<Vec<Column>> for Dataset {
    type Error = SkuMapError;

    fn try_from(columns: Vec<Column>) -> Result<Self> {
        Self::from_columns(columns)
    }
}

impl From<Dataset> for Vec<Column> {
    fn from(dataset: Dataset) -> Self {
        dataset.columns
    }
}

// ---------------------------------------------------------------------------
// SampleRecord
// ---------------------------------------------------------------------------

/// One `(original, resolved)` pair captured from a swept column for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Identifier column the sample was taken from (e.g. `SKU`).
    pub column: String,
    /// Derived column holding the resolution (e.g. `MSKU`).
    pub derived_column: String,
    /// Original cell value.
    pub original: CellValue,
    /// Canonical identifier, or `None` when the value is unmapped.
    pub resolved: Option<String>,
}

// ---------------------------------------------------------------------------
// Processed files
// ---------------------------------------------------------------------------

/// Everything the persistence layer needs to record one processed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFile {
    /// Upload file name (no directory).
    pub filename: String,
    /// SHA-256 of the raw upload bytes, hex encoded.
    pub content_hash: String,
    /// Row count of the annotated dataset.
    pub total_rows: usize,
    /// Column count of the annotated dataset, derived columns included.
    pub columns_count: usize,
    /// All column names, derived columns included.
    pub columns: Vec<String>,
    /// Ordered sample records (primary first, then secondaries).
    pub samples: Vec<SampleRecord>,
}

/// A processed-file row read back from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFileRecord {
    pub id: FileId,
    pub filename: String,
    pub content_hash: String,
    pub total_rows: usize,
    pub columns_count: usize,
    pub columns: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

/// A stored sample mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRecord {
    pub file_id: FileId,
    pub source_column: String,
    pub original_sku: String,
    /// `None` when the identifier was unmapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_msku: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_roundtrip() {
        let id = FileId::new();
        let parsed: FileId = id.to_string().parse().expect("parse FileId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn cell_tokens() {
        assert_eq!(CellValue::from("pen-blue").as_token(), "pen-blue");
        assert_eq!(CellValue::Null.as_token(), "nan");
        assert_eq!(CellValue::Int(42).as_token(), "42");
        assert_eq!(CellValue::Float(12.0).as_token(), "12.0");
        assert_eq!(CellValue::Float(1.5).as_token(), "1.5");
        assert_eq!(CellValue::Float(f64::NAN).as_token(), "nan");
        assert_eq!(CellValue::Bool(true).as_token(), "True");
    }

    #[test]
    fn cell_json_is_untagged() {
        let cells = vec![CellValue::Null, CellValue::Int(3), CellValue::from("pen")];
        let json = serde_json::to_string(&cells).expect("serialize");
        assert_eq!(json, r#"[null,3,"pen"]"#);
    }

    #[test]
    fn dataset_rejects_ragged_columns() {
        let mut ds = Dataset::new();
        ds.push_column(Column::from_strs("SKU", &["a", "b"])).unwrap();
        let err = ds
            .push_column(Column::from_strs("Qty", &["1"]))
            .unwrap_err();
        assert!(err.to_string().contains("has 1 rows"));
        assert_eq!(ds.column_count(), 1);
    }

    #[test]
    fn dataset_allows_duplicate_names() {
        let ds = Dataset::from_columns(vec![
            Column::from_strs("MSKU", &["x"]),
            Column::from_strs("MSKU", &["y"]),
        ])
        .unwrap();
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.column("MSKU").unwrap().cells[0], CellValue::from("x"));
    }

    #[test]
    fn derive_column_appends_same_length() {
        let mut ds = Dataset::from_columns(vec![Column::from_strs("SKU", &["a", "b"])]).unwrap();
        let idx = ds
            .derive_column(0, "SKU_UPPER", |_, cell| {
                CellValue::from(cell.as_token().to_uppercase())
            })
            .expect("source exists");
        assert_eq!(idx, 1);
        assert_eq!(ds.column_names(), vec!["SKU", "SKU_UPPER"]);
        assert_eq!(ds.columns()[1].cells[1], CellValue::from("B"));
        assert!(ds.derive_column(9, "nope", |_, c| c.clone()).is_none());
    }

    #[test]
    fn large_and_tiny_floats_use_exponent_form() {
        assert_eq!(CellValue::Float(1e16).as_token(), "1e+16");
        assert_eq!(CellValue::Float(1.5e16).as_token(), "1.5e+16");
        assert_eq!(CellValue::Float(-2.5e20).as_token(), "-2.5e+20");
        assert_eq!(CellValue::Float(1e-5).as_token(), "1e-05");
        assert_eq!(CellValue::Float(0.0001).as_token(), "0.0001");
        assert_eq!(CellValue::Float(0.0).as_token(), "0.0");
        assert_eq!(
            CellValue::Float(1234567890123456.0).as_token(),
            "1234567890123456.0"
        );
    }

    #[test]
    fn dataset_json_roundtrip() {
        let ds = Dataset::from_columns(vec![
            Column::from_strs("SKU", &["pen", "ink"]),
            Column::new("Qty", vec![CellValue::Int(1), CellValue::Null]),
        ])
        .unwrap();
        let json = serde_json::to_string(&ds).expect("serialize");
        let back: Dataset = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ds);
        assert_eq!(back.row_count(), 2);
    }

    #[test]
    fn dataset_json_with_ragged_columns_is_rejected() {
        let json = r#"[{"name":"SKU","cells":["pen"]},{"name":"Qty","cells":[1,2,3]}]"#;
        let err = serde_json::from_str::<Dataset>(json).unwrap_err();
        assert!(err.to_string().contains("has 3 rows"));
    }

    #[test]
    fn dataset_json_cannot_claim_extra_rows() {
        let json = r#"{"columns":[{"name":"SKU","cells":["pen"]}],"row_count":3}"#;
        assert!(serde_json::from_str::<Dataset>(json).is_err());
    }
}
