//! Header row, category row and marker detection

use crate::config::ColumnConfig;
use crate::error::AuditError;
use crate::reader::{CellValue, Grid, cell_in_row};

/// Category applied to items that precede any category row
pub const DEFAULT_CATEGORY: &str = "General";

/// Category labels must be longer than this many characters
const MIN_CATEGORY_CHARS: usize = 10;

const MARKER_WORDS: [&str; 4] = ["x", "v", "si", "sí"];
const CHECK_GLYPHS: [char; 5] = ['✓', '✔', '☑', '✅', '√'];

/// Whether a cell holds an affirmative tick ("x", "v", "si", "sí" or a check glyph)
pub fn is_marker(cell: &CellValue) -> bool {
    let CellValue::Text(text) = cell else {
        return false;
    };
    let normalized = text.trim().to_lowercase();
    MARKER_WORDS.contains(&normalized.as_str()) || normalized.chars().any(is_check_glyph)
}

fn is_check_glyph(c: char) -> bool {
    CHECK_GLYPHS.contains(&c)
}

/// Find the first row with a cell containing one of `tokens` (case-insensitive).
///
/// There is no default: a sheet without such a row cannot be extracted.
pub fn detect_header_row<S: AsRef<str>>(grid: &Grid, tokens: &[S]) -> Result<u32, AuditError> {
    let tokens: Vec<String> = tokens
        .iter()
        .map(|t| t.as_ref().trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();

    grid.rows()
        .position(|row| {
            row.iter().any(|cell| {
                let text = cell.to_string().to_uppercase();
                tokens.iter().any(|token| text.contains(token.as_str()))
            })
        })
        .map(|idx| idx as u32)
        .ok_or(AuditError::HeaderNotFound { tokens })
}

fn is_numeral(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(n) => n.is_finite() && n.fract() == 0.0,
        CellValue::Text(s) => {
            let s = s.trim();
            !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Return the section label if `row` is a numbered category header.
///
/// The first cell must be a whole number and the second a label longer than
/// ten characters that is all caps or carries no question mark, with no
/// check glyph. Status columns are not consulted.
pub fn category_label(row: &[CellValue]) -> Option<String> {
    if !is_numeral(cell_in_row(row, 0)) {
        return None;
    }
    let CellValue::Text(text) = cell_in_row(row, 1) else {
        return None;
    };
    let label = text.trim();
    if label.chars().count() <= MIN_CATEGORY_CHARS {
        return None;
    }

    let uppercase = label.chars().any(char::is_alphabetic) && label == label.to_uppercase();
    let has_question = label.contains('?') || label.contains('¿');
    if !uppercase && has_question {
        return None;
    }
    if label.chars().any(is_check_glyph) {
        return None;
    }

    Some(label.to_string())
}

/// Running category context over a top-down, single pass of item rows
#[derive(Debug, Default)]
pub struct CategoryTracker {
    current: Option<String>,
}

impl CategoryTracker {
    /// Feed the next row; returns true when it was a category header
    pub fn observe(&mut self, row: &[CellValue]) -> bool {
        match category_label(row) {
            Some(label) => {
                log::debug!("Entering category '{}'", label);
                self.current = Some(label);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> &str {
        self.current.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

const QUESTION_CAPTIONS: [&str; 5] = ["PREGUNTA", "ASPECTO", "REQUISITO", "DESCRIP", "CRITERIO"];

/// Propose a configuration from the captions of the detected header row.
///
/// Only columns and the header row are filled in; metadata cells are left
/// for the user, so the proposal does not validate until completed.
pub fn suggest_config<S: AsRef<str>>(
    grid: &Grid,
    tokens: &[S],
) -> Result<ColumnConfig, AuditError> {
    let header_row = detect_header_row(grid, tokens)?;
    let mut config = ColumnConfig {
        header_row: Some(header_row),
        ..ColumnConfig::default()
    };
    let mut item_column = None;

    for (col, cell) in grid.row(header_row).iter().enumerate() {
        let col = col as u32;
        let caption = cell.to_string().trim().to_uppercase();
        if caption.is_empty() {
            continue;
        }

        let slot = if caption.contains("PARCIAL") {
            &mut config.cumple_parcial
        } else if caption.contains("NO CUMPLE") {
            &mut config.no_cumple
        } else if caption.contains("NO APLICA") || caption == "N/A" || caption == "NA" {
            &mut config.no_aplica
        } else if caption.contains("CUMPLE") {
            &mut config.cumple
        } else if caption.contains("OBSERV") {
            &mut config.observation
        } else if QUESTION_CAPTIONS.iter().any(|c| caption.contains(c)) {
            &mut config.question
        } else if caption.contains("ITEM") || caption.contains("ÍTEM") {
            &mut item_column
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(col);
        }
    }

    if config.question.is_none() {
        config.question = item_column;
    }
    log::debug!("Suggested configuration from header row {}", header_row + 1);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::text(*c)).collect()
    }

    #[test]
    fn test_markers() {
        for marker in ["x", "X", " x ", "v", "Si", "SÍ", "✓", "✔"] {
            assert!(is_marker(&CellValue::Text(marker.to_string())), "{marker}");
        }
        for other in ["", "no", "xx", "Existe", "0"] {
            assert!(!is_marker(&CellValue::text(other)), "{other}");
        }
        assert!(!is_marker(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_header_row_detection() {
        let grid = Grid::from_strings(&[
            vec!["LISTA DE CHEQUEO", ""],
            vec!["Operación", "Planta"],
            vec!["N°", "Ítems", "Cumple", "No cumple"],
            vec!["1", "¿Pregunta?", "x", ""],
        ]);
        assert_eq!(detect_header_row(&grid, &["CUMPLE", "ITEMS"]).unwrap(), 2);
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let grid = Grid::from_strings(&[vec!["a", "b"], vec!["c", "d"]]);
        let err = detect_header_row(&grid, &["CUMPLE"]).unwrap_err();
        assert!(matches!(err, AuditError::HeaderNotFound { .. }));
    }

    #[test]
    fn test_category_rows() {
        assert_eq!(
            category_label(&row(&["1", "ORDEN Y LIMPIEZA DEL ÁREA"])).as_deref(),
            Some("ORDEN Y LIMPIEZA DEL ÁREA")
        );
        // mixed case without question mark still counts
        assert!(category_label(&row(&["2", "Manejo de residuos sólidos"])).is_some());
        // numeric first cell as a number
        let numbered = vec![
            CellValue::Number(3.0),
            CellValue::text("ALMACENAMIENTO DE QUÍMICOS"),
        ];
        assert!(category_label(&numbered).is_some());
        // all caps question is still a category
        assert!(category_label(&row(&["4", "¿EXISTE SEÑALIZACIÓN?"])).is_some());
        // a tick in a status column does not turn the row into an item
        assert_eq!(
            category_label(&row(&["5", "Pisos limpios y secos", "x"])).as_deref(),
            Some("Pisos limpios y secos")
        );
    }

    #[test]
    fn test_item_rows_are_not_categories() {
        // question mark in mixed case
        assert!(category_label(&row(&["1", "¿Los pisos están limpios?"])).is_none());
        // too short
        assert!(category_label(&row(&["1", "¿Test A?", "x"])).is_none());
        assert!(category_label(&row(&["1", "GENERALES"])).is_none());
        // non-numeric first cell
        assert!(category_label(&row(&["1.1", "ORDEN Y LIMPIEZA DEL ÁREA"])).is_none());
        // check glyph inside the label
        assert!(category_label(&row(&["6", "ORDEN Y LIMPIEZA ✓"])).is_none());
    }

    #[test]
    fn test_tracker_defaults_to_general() {
        let mut tracker = CategoryTracker::default();
        assert_eq!(tracker.current(), DEFAULT_CATEGORY);
        assert!(tracker.observe(&row(&["1", "EQUIPOS DE PROTECCIÓN"])));
        assert!(!tracker.observe(&row(&["1", "¿Usa casco?", "x"])));
        assert_eq!(tracker.current(), "EQUIPOS DE PROTECCIÓN");
    }

    #[test]
    fn test_suggest_config_from_captions() {
        let grid = Grid::from_strings(&[
            vec!["Operación:", "Planta"],
            vec![
                "ÍTEM",
                "PREGUNTA",
                "CUMPLE",
                "CUMPLE PARCIALMENTE",
                "NO CUMPLE",
                "NO APLICA",
                "OBSERVACIONES",
            ],
        ]);
        let config = suggest_config(&grid, &["CUMPLE"]).unwrap();
        assert_eq!(config.header_row, Some(1));
        assert_eq!(config.question, Some(1));
        assert_eq!(config.cumple, Some(2));
        assert_eq!(config.cumple_parcial, Some(3));
        assert_eq!(config.no_cumple, Some(4));
        assert_eq!(config.no_aplica, Some(5));
        assert_eq!(config.observation, Some(6));
        assert!(matches!(config.validate(), Err(AuditError::UnmappedCell("operation"))));
    }

    #[test]
    fn test_suggest_falls_back_to_item_caption() {
        let grid = Grid::from_strings(&[vec!["N°", "ITEMS", "CUMPLE", "NO CUMPLE"]]);
        let config = suggest_config(&grid, &["ITEMS"]).unwrap();
        assert_eq!(config.question, Some(1));
        assert_eq!(config.cumple, Some(2));
        assert_eq!(config.no_cumple, Some(3));
    }
}
