//! XLSX → [`Dataset`] reader for the first worksheet of a workbook.
//!
//! The first row is the header. Cells keep the type stored in the workbook,
//! adjusted the way dataframe loaders adjust them: whole-number floats read
//! as integers, and a numeric column with blanks or with both integers and
//! floats becomes `Float`. Dates render as `YYYY-MM-DD HH:MM:SS` text.

use std::io::{Read, Seek};
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use tracing::debug;

use skumap_shared::{CellValue, Column, Dataset, Result, SkuMapError};

use crate::reader::dedupe_headers;

/// Largest magnitude at which every whole `f64` is exactly an `i64`.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Read the first worksheet of an XLSX workbook into a dataset.
pub fn read_xlsx<R: Read + Seek>(reader: R) -> Result<Dataset> {
    let mut workbook: Xlsx<R> = open_workbook_from_rs(reader)
        .map_err(|e| SkuMapError::parse(format!("failed to open XLSX workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SkuMapError::parse("XLSX workbook has no worksheets"))?
        .map_err(|e| SkuMapError::parse(format!("failed to read XLSX worksheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Dataset::new());
    };
    let headers = dedupe_headers(header.iter().map(header_name).collect());

    let mut raw: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (idx, cells) in raw.iter_mut().enumerate() {
            cells.push(row.get(idx).map_or(CellValue::Null, cell_value));
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| Column::new(name, normalize_numeric(cells)))
        .collect::<Vec<_>>();

    let dataset = Dataset::from_columns(columns)?;
    debug!(
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "parsed XLSX"
    );
    Ok(dataset)
}

/// Read an XLSX file from disk.
pub fn read_xlsx_path(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).map_err(|e| SkuMapError::io(path, e))?;
    read_xlsx(std::io::BufReader::new(file))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn whole_number(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f.abs() < MAX_EXACT_INT).then_some(f as i64)
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::Float(f) => whole_number(*f).map_or_else(|| f.to_string(), |i| i.to_string()),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => whole_number(*f).map_or(CellValue::Float(*f), CellValue::Int),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => CellValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Text(cell.to_string()),
        },
        other => CellValue::Text(other.to_string()),
    }
}

/// Widen an all-numeric column to `Float` when it has blanks or mixes
/// integers with floats. Other columns are returned untouched.
fn normalize_numeric(cells: Vec<CellValue>) -> Vec<CellValue> {
    let present = || cells.iter().filter(|c| !c.is_null());
    let numeric = present().all(|c| matches!(c, CellValue::Int(_) | CellValue::Float(_)));
    if present().next().is_none() || !numeric {
        return cells;
    }

    let all_int = present().all(|c| matches!(c, CellValue::Int(_)));
    let has_blanks = cells.iter().any(CellValue::is_null);
    if all_int && !has_blanks {
        return cells;
    }

    cells
        .into_iter()
        .map(|cell| match cell {
            CellValue::Int(i) => CellValue::Float(i as f64),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::io::Cursor;

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in ["SKU", "Warehouse_SKU", "Qty", "Price", "Active"]
            .into_iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, name).expect("header");
        }
        sheet.write_string(1, 0, "pen").expect("cell");
        sheet.write_string(1, 1, "pen-blue2").expect("cell");
        sheet.write_number(1, 2, 1.0).expect("cell");
        sheet.write_number(1, 3, 2.5).expect("cell");
        sheet.write_boolean(1, 4, true).expect("cell");

        sheet.write_number(2, 0, 12.0).expect("cell");
        sheet.write_number(2, 2, 2.0).expect("cell");
        sheet.write_number(2, 3, 3.0).expect("cell");
        sheet.write_boolean(2, 4, false).expect("cell");

        sheet.write_string(3, 0, "pen-blue").expect("cell");
        sheet.write_string(3, 1, "x").expect("cell");
        sheet.write_number(3, 2, 3.0).expect("cell");
        sheet.write_number(3, 3, 4.0).expect("cell");
        sheet.write_boolean(3, 4, true).expect("cell");

        workbook.save_to_buffer().expect("save workbook")
    }

    #[test]
    fn reads_first_sheet() {
        let ds = read_xlsx(Cursor::new(workbook_bytes())).expect("valid workbook");
        assert_eq!(
            ds.column_names(),
            vec!["SKU", "Warehouse_SKU", "Qty", "Price", "Active"]
        );
        assert_eq!(ds.row_count(), 3);
        assert_eq!(
            ds.column("SKU").unwrap().cells,
            vec![
                CellValue::from("pen"),
                CellValue::Int(12),
                CellValue::from("pen-blue")
            ]
        );
        assert_eq!(
            ds.column("Warehouse_SKU").unwrap().cells,
            vec![
                CellValue::from("pen-blue2"),
                CellValue::Null,
                CellValue::from("x")
            ]
        );
        assert_eq!(
            ds.column("Qty").unwrap().cells,
            vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)]
        );
        assert_eq!(
            ds.column("Price").unwrap().cells,
            vec![
                CellValue::Float(2.5),
                CellValue::Float(3.0),
                CellValue::Float(4.0)
            ]
        );
        assert_eq!(
            ds.column("Active").unwrap().cells,
            vec![
                CellValue::Bool(true),
                CellValue::Bool(false),
                CellValue::Bool(true)
            ]
        );
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = read_xlsx(Cursor::new(b"not a workbook".to_vec())).unwrap_err();
        assert!(matches!(err, SkuMapError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_xlsx_path(Path::new("/definitely/not/here.xlsx")).unwrap_err();
        assert!(matches!(err, SkuMapError::Io { .. }));
    }

    #[test]
    fn cell_conversion() {
        assert_eq!(cell_value(&Data::Empty), CellValue::Null);
        assert_eq!(cell_value(&Data::String(String::new())), CellValue::Null);
        assert_eq!(cell_value(&Data::Float(12.0)), CellValue::Int(12));
        assert_eq!(cell_value(&Data::Float(1.25)), CellValue::Float(1.25));
        assert_eq!(cell_value(&Data::Float(1e17)), CellValue::Float(1e17));
        assert_eq!(cell_value(&Data::Bool(false)), CellValue::Bool(false));
        assert_eq!(
            cell_value(&Data::String("pen".into())),
            CellValue::from("pen")
        );
    }

    #[test]
    fn integer_column_with_blanks_becomes_float() {
        let cells = normalize_numeric(vec![CellValue::Int(12), CellValue::Null]);
        assert_eq!(cells, vec![CellValue::Float(12.0), CellValue::Null]);
        assert_eq!(cells[0].as_token(), "12.0");
    }

    #[test]
    fn mixed_text_column_keeps_cell_types() {
        let cells = vec![CellValue::from("pen"), CellValue::Int(12), CellValue::Null];
        assert_eq!(normalize_numeric(cells.clone()), cells);
    }

    #[test]
    fn header_names() {
        assert_eq!(header_name(&Data::String("SKU".into())), "SKU");
        assert_eq!(header_name(&Data::Float(2024.0)), "2024");
        assert_eq!(header_name(&Data::Empty), "");
    }
}
