use crate::error::LoadError;
use crate::normalize::{is_known_column, normalize_all};
use crate::types::{CellValue, RawRow, SalesRecord};
use crate::util::excel_serial_to_date;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub sheet: Option<String>,
    pub total_rows: usize,
    pub parse_errors: usize,
    pub missing_group: usize,
    pub missing_week: usize,
    pub ignored_columns: Vec<String>,
}

/// Read the sheet and normalize every row.
pub fn load_and_normalize(
    path: &str,
    sheet: Option<&str>,
) -> Result<(Vec<SalesRecord>, LoadReport), LoadError> {
    let (rows, mut report) = read_rows(path, sheet)?;
    let records = normalize_all(&rows);
    report.missing_group = records.iter().filter(|r| r.group_name.is_empty()).count();
    report.missing_week = records.iter().filter(|r| r.week.is_none()).count();
    info!(
        path,
        rows = report.total_rows,
        missing_group = report.missing_group,
        missing_week = report.missing_week,
        "sales data loaded"
    );
    Ok((records, report))
}

/// Read raw rows from a workbook or CSV file, picking the reader by extension.
pub fn read_rows(path: &str, sheet: Option<&str>) -> Result<(Vec<RawRow>, LoadReport), LoadError> {
    let p = Path::new(path);
    std::fs::metadata(p).map_err(|e| LoadError::from_io(path, e))?;
    let ext = p
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path, sheet),
        "csv" => read_csv(path),
        _ => Err(LoadError::Unsupported { path: path.to_string() }),
    }
}

fn read_workbook(path: &str, sheet: Option<&str>) -> Result<(Vec<RawRow>, LoadReport), LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::from_failure(path, e))?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LoadError::Parse {
                path: path.to_string(),
                message: "workbook has no sheets".to_string(),
            })?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| LoadError::from_failure(path, e))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => Vec::new(),
    };

    let mut report = LoadReport {
        sheet: Some(sheet_name.clone()),
        ignored_columns: ignored_columns(&headers),
        ..Default::default()
    };
    let mut rows = Vec::new();
    for cells in rows_iter {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        report.total_rows += 1;
        rows.push(build_row(&headers, cells.iter().map(cell_value)));
    }
    debug!(sheet = %sheet_name, columns = headers.len(), rows = rows.len(), "read worksheet");
    Ok((rows, report))
}

fn read_csv(path: &str) -> Result<(Vec<RawRow>, LoadReport), LoadError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| LoadError::from_failure(path, e))?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| LoadError::from_failure(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut report = LoadReport {
        ignored_columns: ignored_columns(&headers),
        ..Default::default()
    };
    let mut rows = Vec::new();
    for result in rdr.records() {
        report.total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "skipping malformed csv record");
                report.parse_errors += 1;
                continue;
            }
        };
        rows.push(build_row(
            &headers,
            record.iter().map(|v| CellValue::from(v.trim())),
        ));
    }
    Ok((rows, report))
}

/// Pair headers with cells. Short rows leave trailing columns absent, and
/// for duplicate headers the first column wins.
fn build_row(headers: &[String], cells: impl Iterator<Item = CellValue>) -> RawRow {
    let mut row = RawRow::new();
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        row.entry(header.clone()).or_insert(cell);
    }
    row
}

fn ignored_columns(headers: &[String]) -> Vec<String> {
    let ignored: Vec<String> = headers
        .iter()
        .filter(|h| !h.is_empty() && !is_known_column(h))
        .cloned()
        .collect();
    if !ignored.is_empty() {
        debug!(columns = ?ignored, "ignoring unrecognized columns");
    }
    if !headers.iter().any(|h| h == "Group" || h == "Группа") {
        warn!("no group column found; records will have empty group names");
    }
    ignored
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::from(s.trim()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Empty),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}
