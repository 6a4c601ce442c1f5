//! Raw sheet reading: CSV exports and Excel workbooks into the same grid of
//! trimmed text cells.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::error::{AnalysisError, Result};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    /// xlsx/xlsb/ods (zip container) or legacy xls (OLE container).
    Workbook,
}

impl SheetFormat {
    /// Picks the reader from the leading bytes; anything that is not a zip or
    /// OLE container is read as CSV.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            SheetFormat::Workbook
        } else {
            SheetFormat::Csv
        }
    }
}

/// One data row and the 1-based line (spreadsheet row) it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: u64,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Reads the header row and data rows of a CSV export or of the first
/// worksheet of a workbook.
pub fn read_sheet(bytes: &[u8]) -> Result<RawSheet> {
    let format = SheetFormat::detect(bytes);
    debug!(?format, bytes = bytes.len(), "Reading sheet");
    match format {
        SheetFormat::Csv => read_csv(bytes),
        SheetFormat::Workbook => read_workbook(bytes),
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawSheet> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let header = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(RawRow {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            cells: record.iter().map(|c| c.trim().to_string()).collect(),
        });
    }

    Ok(RawSheet { header, rows })
}

fn read_workbook(bytes: &[u8]) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| AnalysisError::invalid(format!("unreadable workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AnalysisError::invalid("workbook has no worksheet"))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AnalysisError::invalid(format!("unreadable worksheet '{sheet_name}': {e}")))?;

    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or(0);
    let mut grid = range.rows().enumerate().map(|(i, row)| RawRow {
        line: first_row + i as u64 + 1,
        cells: row.iter().map(cell_text).collect(),
    });

    let header = grid
        .next()
        .ok_or_else(|| AnalysisError::invalid(format!("worksheet '{sheet_name}' is empty")))?
        .cells;
    let rows = grid
        .filter(|row| row.cells.iter().any(|c| !c.is_empty()))
        .collect();

    debug!(sheet = %sheet_name, "Read first worksheet");
    Ok(RawSheet { header, rows })
}

/// Whole floats drop the fraction (`5.0` reads as `"5"`), the way a class
/// code typed into Excel is meant.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        other => other.to_string().trim().to_string(),
    }
}
