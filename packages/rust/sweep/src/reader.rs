//! CSV → [`Dataset`] reader.
//!
//! The first record is the header. Cell types are inferred per column, the
//! way spreadsheet tooling does it:
//! - every non-empty cell an integer → `Int` (or `Float` if the column has blanks)
//! - every non-empty cell a number → `Float`
//! - every non-empty cell `true`/`false` → `Bool`
//! - otherwise → `Text`, kept byte for byte
//!
//! Empty cells are always `Null`. Blank header names become `Unnamed: N` and
//! duplicates get a `.N` suffix.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use skumap_shared::{CellValue, Column, Dataset, Result, SkuMapError};

/// Read a CSV document into a dataset.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| SkuMapError::parse(format!("failed to read CSV header: {e}")))?
        .iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let headers = dedupe_headers(headers);

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (line, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| SkuMapError::parse(format!("failed to read CSV record: {e}")))?;
        if record.len() > headers.len() {
            return Err(SkuMapError::parse(format!(
                "row {}: expected {} fields, saw {}",
                line + 1,
                headers.len(),
                record.len()
            )));
        }
        for (idx, cells) in raw.iter_mut().enumerate() {
            let cell = record.get(idx).filter(|c| !c.is_empty());
            cells.push(cell.map(String::from));
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| Column::new(name, infer_column(cells)))
        .collect::<Vec<_>>();

    let dataset = Dataset::from_columns(columns)?;
    debug!(
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "parsed CSV"
    );
    Ok(dataset)
}

/// Read a CSV file from disk.
pub fn read_csv_path(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).map_err(|e| SkuMapError::io(path, e))?;
    read_csv(std::io::BufReader::new(file))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Blank headers become `Unnamed: {index}`; repeats get a `.N` suffix.
pub(crate) fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = if name.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            };
            if seen.insert(name.clone()) {
                return name;
            }
            let mut n = 1;
            loop {
                let candidate = format!("{name}.{n}");
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn infer_column(cells: Vec<Option<String>>) -> Vec<CellValue> {
    let present = || cells.iter().flatten().map(|s| s.trim());
    let has_blanks = cells.iter().any(Option::is_none);

    if present().next().is_none() {
        return cells.into_iter().map(|_| CellValue::Null).collect();
    }

    if present().all(|s| s.parse::<i64>().is_ok()) {
        return cells
            .iter()
            .map(|c| match c.as_deref().map(str::trim).map(str::parse::<i64>) {
                Some(Ok(i)) if has_blanks => CellValue::Float(i as f64),
                Some(Ok(i)) => CellValue::Int(i),
                _ => CellValue::Null,
            })
            .collect();
    }

    if present().all(|s| s.parse::<f64>().is_ok()) {
        return cells
            .iter()
            .map(|c| match c.as_deref().map(str::trim).map(str::parse::<f64>) {
                Some(Ok(f)) => CellValue::Float(f),
                _ => CellValue::Null,
            })
            .collect();
    }

    if present().all(|s| parse_bool(s).is_some()) {
        return cells
            .iter()
            .map(|c| match c.as_deref().map(str::trim).and_then(parse_bool) {
                Some(b) => CellValue::Bool(b),
                None => CellValue::Null,
            })
            .collect();
    }

    cells.into_iter().map(CellValue::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> Dataset {
        read_csv(csv.as_bytes()).expect("valid csv")
    }

    #[test]
    fn reads_header_and_rows() {
        let ds = parse("SKU,Qty\npen,1\npen-blue,2\n");
        assert_eq!(ds.column_names(), vec!["SKU", "Qty"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(
            ds.column("SKU").unwrap().cells,
            vec![CellValue::from("pen"), CellValue::from("pen-blue")]
        );
        assert_eq!(
            ds.column("Qty").unwrap().cells,
            vec![CellValue::Int(1), CellValue::Int(2)]
        );
    }

    #[test]
    fn short_rows_pad_with_null() {
        let ds = parse("SKU,Qty\npen\n");
        assert_eq!(ds.column("Qty").unwrap().cells, vec![CellValue::Null]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let err = read_csv("SKU\npen,extra\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("expected 1 fields"));
    }

    #[test]
    fn integer_column_with_blanks_becomes_float() {
        let ds = parse("SKU,Qty\n12,1\n,2\n7,3\n");
        assert_eq!(
            ds.column("SKU").unwrap().cells,
            vec![CellValue::Float(12.0), CellValue::Null, CellValue::Float(7.0)]
        );
        assert_eq!(ds.column("SKU").unwrap().cells[0].as_token(), "12.0");
    }

    #[test]
    fn mixed_column_stays_text() {
        let ds = parse("SKU\n 001 \npen\n");
        assert_eq!(
            ds.column("SKU").unwrap().cells,
            vec![CellValue::from(" 001 "), CellValue::from("pen")]
        );
    }

    #[test]
    fn bool_and_float_columns() {
        let ds = parse("Active,Price\nTRUE,1.5\nfalse,2\n");
        assert_eq!(
            ds.column("Active").unwrap().cells,
            vec![CellValue::Bool(true), CellValue::Bool(false)]
        );
        assert_eq!(
            ds.column("Price").unwrap().cells,
            vec![CellValue::Float(1.5), CellValue::Float(2.0)]
        );
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let ds = parse("SKU,SKU,SKU\na,b,c\n");
        assert_eq!(ds.column_names(), vec!["SKU", "SKU.1", "SKU.2"]);
    }

    #[test]
    fn blank_headers_are_named_by_position() {
        let ds = parse("SKU,,Qty\npen,x,1\n");
        assert_eq!(ds.column_names(), vec!["SKU", "Unnamed: 1", "Qty"]);
    }

    #[test]
    fn header_only_file() {
        let ds = parse("SKU,Warehouse_SKU\n");
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.row_count(), 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_csv_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, SkuMapError::Io { .. }));
    }
}
