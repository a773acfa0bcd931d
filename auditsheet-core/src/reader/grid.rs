//! Sheet grid data structures and typed cell readers

use super::dates;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

static EMPTY: CellValue = CellValue::Empty;

/// Cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl CellValue {
    /// Build a text cell, mapping blank strings to `Empty`
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// Check if the cell is empty or holds only whitespace
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

/// Zero-based cell coordinate, rendered as an Excel reference (e.g. "B3")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to Excel-style reference (e.g., "A1")
    pub fn to_excel_ref(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row + 1)
    }
}

/// Convert column number to letter (0 -> A, 1 -> B, 26 -> AA)
pub fn column_letter(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_excel_ref())
    }
}

/// Get the value at `col` within a row slice, `Empty` when out of bounds
pub fn cell_in_row(row: &[CellValue], col: u32) -> &CellValue {
    row.get(col as usize).unwrap_or(&EMPTY)
}

/// Plain grid-of-values view of one worksheet.
///
/// Coordinates are absolute: row 0 / column 0 is cell A1 even when the
/// used range of the source sheet starts further down or right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a grid of text cells; empty strings become `Empty`
    pub fn from_strings<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|s| CellValue::text(s.as_ref())).collect())
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over rows top-down
    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Get a row, or an empty slice when out of bounds
    pub fn row(&self, row: u32) -> &[CellValue] {
        self.rows.get(row as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, row: u32, col: u32) -> &CellValue {
        cell_in_row(self.row(row), col)
    }

    pub fn cell(&self, cell: CellRef) -> &CellValue {
        self.get(cell.row, cell.col)
    }

    /// Read a cell as trimmed text; out of bounds or empty yields ""
    pub fn read_string(&self, cell: CellRef) -> String {
        self.cell(cell).to_string().trim().to_string()
    }

    /// Read a cell as a number; absent or non-numeric yields `None`
    pub fn read_number(&self, cell: CellRef) -> Option<f64> {
        number_value(self.cell(cell))
    }

    /// Read a cell as a calendar date; unparseable yields `None`
    pub fn read_date(&self, cell: CellRef) -> Option<NaiveDate> {
        dates::parse_date_value(self.cell(cell))
    }
}

/// Coerce a cell value to a number.
///
/// Text uses a comma or period as decimal separator and may carry a
/// trailing percent sign, which is dropped without scaling.
pub fn number_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
            if trimmed.is_empty() {
                return None;
            }
            trimmed
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
        }
        _ => None,
    }
}
