//! Date coercion for audit cells
//!
//! Three shapes are accepted: spreadsheet day serials, day-first numeric
//! dates (`DD/MM/YYYY`, `DD-MM-YY`) and Spanish long-form dates
//! (`20 de agosto del 2025`). Month-first interpretation is never tried.

use super::CellValue;
use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Serials outside `[MIN_SERIAL, MAX_SERIAL)` are not treated as dates
pub const MIN_SERIAL: f64 = 1.0;
pub const MAX_SERIAL: f64 = 100_000.0;

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4}|\d{2})$").expect("valid day-first pattern")
});

static SPANISH_LONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})\s+(?:de\s+)?(\p{L}+)\s+(?:del?\s+)?(\d{4})$")
        .expect("valid long-form pattern")
});

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Epoch of numeric audit dates; serial 1 is the epoch itself
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch date")
}

/// Accept only dates with a year strictly between 2000 and 2100
fn supported(date: NaiveDate) -> Option<NaiveDate> {
    (date.year() > 2000 && date.year() < 2100).then_some(date)
}

/// Convert a day serial typed into a cell to a calendar date.
///
/// The date is the epoch plus `serial - 1` whole days; any time-of-day
/// fraction is dropped. Native date cells are converted by the reader.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !(MIN_SERIAL..MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.floor() as i64 - 1;
    let date = serial_epoch().checked_add_signed(Duration::days(days))?;
    supported(date)
}

/// Convert a calendar date to its day serial, the inverse of [`from_serial`]
pub fn to_serial(date: NaiveDate) -> f64 {
    ((date - serial_epoch()).num_days() + 1) as f64
}

/// Map a Spanish month name to its number (1-12)
pub fn spanish_month(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    if name == "setiembre" {
        return Some(9);
    }
    SPANISH_MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

/// Parse `DD/MM/YYYY` or `DD-MM-YYYY`; two-digit years below 50 are 20xx.
///
/// Impossible dates such as 31/04 are rejected instead of rolling over.
pub fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let caps = DAY_FIRST.captures(text.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year_text = &caps[3];
    let mut year: i32 = year_text.parse().ok()?;
    if year_text.len() == 2 {
        year += if year < 50 { 2000 } else { 1900 };
    }
    supported(NaiveDate::from_ymd_opt(year, month, day)?)
}

/// Parse "20 de agosto del 2025", "20 de agosto de 2025" or "20 agosto 2025"
pub fn parse_spanish_long(text: &str) -> Option<NaiveDate> {
    let caps = SPANISH_LONG.captures(text.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month = spanish_month(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    supported(NaiveDate::from_ymd_opt(year, month, day)?)
}

/// Parse any accepted textual date shape
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    parse_day_first(text).or_else(|| parse_spanish_long(text))
}

/// Coerce a cell value to a date
pub fn parse_date_value(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(date) => supported(*date),
        CellValue::Number(serial) => from_serial(*serial),
        CellValue::Text(text) => parse_date_text(text),
        CellValue::Empty => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serial_conversion() {
        let date = from_serial(45893.0).unwrap();
        assert!(date.year() > 2000 && date.year() < 2100);
        assert_eq!(date, ymd(2025, 8, 23));
        assert_eq!(from_serial(45889.0), Some(ymd(2025, 8, 19)));
        assert_eq!(from_serial(45889.75), Some(ymd(2025, 8, 19)));
        assert_eq!(to_serial(ymd(2025, 8, 23)), 45893.0);
        assert_eq!(from_serial(0.5), None);
        assert_eq!(from_serial(150_000.0), None);
        // 1950 is a valid serial but outside the accepted year window
        assert_eq!(from_serial(18264.0), None);
    }

    #[test]
    fn test_serial_month_boundary() {
        assert_eq!(from_serial(45901.0), Some(ymd(2025, 8, 31)));
        assert_eq!(from_serial(45902.0), Some(ymd(2025, 9, 1)));
    }

    #[test]
    fn test_day_first_parsing() {
        assert_eq!(parse_day_first("13/01/2024"), Some(ymd(2024, 1, 13)));
        assert_eq!(parse_day_first("05-03-2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_day_first("05/03/24"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_day_first("01/13/2024"), None);
    }

    #[test]
    fn test_impossible_dates_are_rejected() {
        assert_eq!(parse_day_first("31/04/2024"), None);
        assert_eq!(parse_day_first("29/02/2023"), None);
        assert_eq!(parse_day_first("29/02/2024"), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_year_window() {
        // 99 -> 1999
        assert_eq!(parse_day_first("01/01/99"), None);
        assert_eq!(parse_day_first("01/01/2100"), None);
        assert_eq!(parse_day_first("01/01/2000"), None);
        assert_eq!(parse_day_first("01/01/2001"), Some(ymd(2001, 1, 1)));
    }

    #[test]
    fn test_spanish_long_form() {
        assert_eq!(parse_spanish_long("20 de agosto del 2025"), Some(ymd(2025, 8, 20)));
        assert_eq!(parse_spanish_long("20 de agosto de 2025"), Some(ymd(2025, 8, 20)));
        assert_eq!(parse_spanish_long("20 agosto 2025"), Some(ymd(2025, 8, 20)));
        assert_eq!(parse_spanish_long("3 de Septiembre del 2024"), Some(ymd(2024, 9, 3)));
        assert_eq!(parse_spanish_long("31 de abril de 2025"), None);
        assert_eq!(parse_spanish_long("20 de agosteo de 2025"), None);
    }

    #[test]
    fn test_cell_value_dispatch() {
        assert_eq!(
            parse_date_value(&CellValue::Number(45304.0)),
            Some(ymd(2024, 1, 12))
        );
        assert_eq!(
            parse_date_value(&CellValue::Text(" 13/01/2024 ".to_string())),
            Some(ymd(2024, 1, 13))
        );
        assert_eq!(parse_date_value(&CellValue::Date(ymd(2024, 6, 1))), Some(ymd(2024, 6, 1)));
        assert_eq!(parse_date_value(&CellValue::Text("mañana".to_string())), None);
        assert_eq!(parse_date_value(&CellValue::Empty), None);
    }

    proptest! {
        #[test]
        fn property_serial_round_trip(days in 0i64..36_000) {
            let date = ymd(2001, 1, 1) + Duration::days(days);
            prop_assume!(date.year() < 2100);
            prop_assert_eq!(from_serial(to_serial(date)), Some(date));
        }
    }
}
