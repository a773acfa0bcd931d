//! Excel/ODS grid reader using calamine

use crate::error::AuditError;
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto_from_rs};
use chrono::NaiveDate;
use std::io::Cursor;
use std::path::Path;

pub mod dates;
pub mod grid;

pub use grid::{CellRef, CellValue, Grid, cell_in_row, column_letter, number_value};

/// Read the grid of one worksheet from raw workbook bytes.
///
/// `sheet` selects a worksheet by name; `None` takes the first one.
pub fn read_grid_from_bytes(bytes: &[u8], sheet: Option<&str>) -> Result<Grid, AuditError> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();

    let name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| AuditError::SheetNotFound(wanted.to_string()))?,
        None => sheet_names.first().cloned().ok_or(AuditError::EmptyWorkbook)?,
    };

    let range = workbook.worksheet_range(&name)?;
    let grid = grid_from_range(&range);
    log::debug!("Read worksheet '{}' with {} rows", name, grid.row_count());
    Ok(grid)
}

/// Read the grid of one worksheet from a workbook file
pub fn read_grid<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Grid, AuditError> {
    let bytes = std::fs::read(path.as_ref())?;
    read_grid_from_bytes(&bytes, sheet)
}

fn grid_from_range(range: &Range<Data>) -> Grid {
    // Empty sheets have no start
    let Some((start_row, start_col)) = range.start() else {
        return Grid::default();
    };

    let mut rows = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(parse_cell_value));
        rows.push(cells);
    }
    Grid::new(rows)
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::text(s.clone()),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(_) => CellValue::Empty,
        Data::Empty => CellValue::Empty,
        // as_datetime applies the workbook's 1904 flag
        Data::DateTime(dt) if dt.is_datetime() => dt
            .as_datetime()
            .map_or(CellValue::Number(dt.as_f64()), |d| CellValue::Date(d.date())),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .map_or_else(|| CellValue::Text(s.clone()), CellValue::Date),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
