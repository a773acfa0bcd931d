//! Record extraction: grid + column layout -> AuditFile

use crate::config::{ColumnConfig, ColumnLayout};
use crate::detect::{CategoryTracker, is_marker};
use crate::error::AuditError;
use crate::model::{
    AuditFile, AuditItem, AuditStatus, StatusCounts, StatusPercentages, compliance_percentage,
    round2,
};
use crate::reader::{CellRef, CellValue, Grid, cell_in_row, dates};
use chrono::NaiveDate;

/// Question texts shorter than this are noise, not items
pub const MIN_QUESTION_CHARS: usize = 5;

/// Run-level metadata shared by every item of a file
#[derive(Debug, Clone, PartialEq)]
struct RunMetadata {
    operation: String,
    responsible: String,
    client: String,
    auditor: String,
    date: NaiveDate,
}

/// Extract one audit file from a sheet grid.
///
/// Fails before touching any row when `config` is absent or incomplete.
pub fn extract_audit(
    grid: &Grid,
    config: Option<&ColumnConfig>,
    file_name: &str,
) -> Result<AuditFile, AuditError> {
    let layout = ColumnLayout::resolve(config)?;
    extract_with_layout(grid, &layout, file_name)
}

/// Extract one audit file using an already validated layout
pub fn extract_with_layout(
    grid: &Grid,
    layout: &ColumnLayout,
    file_name: &str,
) -> Result<AuditFile, AuditError> {
    let metadata = read_metadata(grid, layout)?;
    let items = collect_items(grid, layout, &metadata, file_name);

    let derived = StatusCounts::from_items(&items);
    let mut counts = StatusCounts::default();
    for status in AuditStatus::PRIORITY {
        *counts.get_mut(status) = layout
            .count_cells
            .get(status)
            .and_then(|cell| read_count(grid, cell))
            .unwrap_or(derived.get(status));
    }
    let total_items = layout
        .total_items_cell
        .and_then(|cell| read_count(grid, cell))
        .unwrap_or(items.len() as u32);

    let compliance = layout
        .compliance_cell
        .and_then(|cell| grid.read_number(cell))
        .map(normalize_percentage)
        .unwrap_or_else(|| compliance_percentage(&counts, total_items));

    let percent = |status| layout.percent_cells.get(status).and_then(|c| grid.read_number(c));
    let declared_percentages = StatusPercentages {
        complies: percent(AuditStatus::Complies),
        partial: percent(AuditStatus::PartiallyComplies),
        fails: percent(AuditStatus::DoesNotComply),
        not_applicable: percent(AuditStatus::NotApplicable),
    };

    log::info!(
        "{}: {} items, {} total, {:.2}% compliance",
        file_name,
        items.len(),
        total_items,
        compliance
    );

    Ok(AuditFile {
        file_name: file_name.to_string(),
        operation: metadata.operation,
        responsible: metadata.responsible,
        client: metadata.client,
        date: metadata.date,
        auditor: metadata.auditor,
        items,
        compliance,
        total_items,
        counts,
        declared_percentages,
    })
}

fn read_metadata(grid: &Grid, layout: &ColumnLayout) -> Result<RunMetadata, AuditError> {
    let operation = label_value(&grid.read_string(layout.operation_cell));
    if operation.is_empty() {
        return Err(AuditError::EmptyCell {
            field: "operation",
            cell: layout.operation_cell,
        });
    }
    let date = read_audit_date(grid, layout.date_cell)?;
    let optional = |cell: Option<CellRef>| {
        cell.map(|c| label_value(&grid.read_string(c)))
            .unwrap_or_default()
    };

    Ok(RunMetadata {
        operation,
        responsible: optional(layout.responsible_cell),
        client: optional(layout.client_cell),
        auditor: optional(layout.auditor_cell),
        date,
    })
}

fn read_audit_date(grid: &Grid, cell: CellRef) -> Result<NaiveDate, AuditError> {
    let value = grid.cell(cell);
    if value.is_empty() {
        return Err(AuditError::EmptyCell { field: "date", cell });
    }
    grid.read_date(cell)
        .or_else(|| match value {
            CellValue::Text(text) => dates::parse_date_text(&label_value(text)),
            _ => None,
        })
        .ok_or_else(|| AuditError::InvalidDate {
            cell,
            raw: value.to_string(),
        })
}

/// Strip a leading "Label:" from a metadata cell when a value follows it
pub fn label_value(text: &str) -> String {
    let text = text.trim();
    match text.split_once(':') {
        Some((_, value)) if !value.trim().is_empty() => value.trim().to_string(),
        _ => text.to_string(),
    }
}

/// Treat 0-1 values as fractions and anything else as a ready percentage
fn normalize_percentage(value: f64) -> f64 {
    if (0.0..=1.0).contains(&value) {
        round2(value * 100.0)
    } else {
        round2(value)
    }
}

fn read_count(grid: &Grid, cell: CellRef) -> Option<u32> {
    grid.read_number(cell)
        .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n.round() as u32)
}

/// Resolve the status of a row from its marker columns, in priority order
fn row_status(row: &[CellValue], layout: &ColumnLayout) -> Option<AuditStatus> {
    layout
        .status_columns
        .iter()
        .find(|(_, col)| is_marker(cell_in_row(row, *col)))
        .map(|(status, _)| *status)
}

fn collect_items(
    grid: &Grid,
    layout: &ColumnLayout,
    metadata: &RunMetadata,
    file_name: &str,
) -> Vec<AuditItem> {
    let mut categories = CategoryTracker::default();
    let mut items = Vec::new();

    for (index, row) in grid.rows().enumerate().skip(layout.header_row as usize + 1) {
        if categories.observe(row) {
            continue;
        }

        let question = cell_in_row(row, layout.question).to_string().trim().to_string();
        if question.chars().count() < MIN_QUESTION_CHARS {
            continue;
        }

        let Some(status) = row_status(row, layout) else {
            log::debug!("{}: row {} has no status marker, skipped", file_name, index + 1);
            continue;
        };

        let observation = layout
            .observation
            .map(|col| cell_in_row(row, col).to_string().trim().to_string())
            .unwrap_or_default();

        let item_number = items.len() as u32 + 1;
        items.push(AuditItem {
            id: format!("{}-{}", file_name, item_number),
            operation: metadata.operation.clone(),
            responsible: metadata.responsible.clone(),
            client: metadata.client.clone(),
            date: metadata.date,
            auditor: metadata.auditor.clone(),
            category: categories.current().to_string(),
            item_number,
            question,
            status,
            observation,
            improvement_opportunity: String::new(),
            regulation: String::new(),
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Metadata on rows 0-1, header on row 2, items below
    fn config() -> ColumnConfig {
        ColumnConfig {
            question: Some(1),
            cumple: Some(2),
            no_cumple: Some(3),
            cumple_parcial: Some(4),
            no_aplica: Some(5),
            header_row: Some(2),
            operation_cell: Some(CellRef::new(0, 1)),
            date_cell: Some(CellRef::new(1, 1)),
            ..ColumnConfig::default()
        }
    }

    fn sheet(items: &[Vec<&str>]) -> Grid {
        let mut rows = vec![
            vec!["Operación", "Planta Norte"],
            vec!["Fecha", "20/08/2025"],
            vec!["N°", "ÍTEMS", "CUMPLE", "NO CUMPLE", "PARCIAL", "NO APLICA"],
        ];
        rows.extend(items.iter().cloned());
        Grid::from_strings(&rows)
    }

    #[test]
    fn test_three_item_scenario() {
        let grid = sheet(&[
            vec!["1", "¿Test A?", "x", ""],
            vec!["2", "¿Test B?", "", "x"],
            vec!["3", "¿Test C?", "", "x"],
        ]);
        let audit = extract_audit(&grid, Some(&config()), "a.xlsx").unwrap();
        assert_eq!(audit.total_items, 3);
        assert_eq!(audit.counts.complies, 1);
        assert_eq!(audit.counts.fails, 2);
        assert_eq!(audit.counts.not_applicable, 0);
        assert_eq!(audit.compliance, 33.33);
        assert_eq!(audit.operation, "Planta Norte");
        assert_eq!(audit.date, NaiveDate::from_ymd_opt(2025, 8, 20).unwrap());
        assert_eq!(audit.items[0].id, "a.xlsx-1");
        assert_eq!(audit.items[2].item_number, 3);
        assert_eq!(audit.items[1].category, "General");
    }

    #[test]
    fn test_missing_config_fails_before_rows() {
        let grid = sheet(&[vec!["1", "¿Test A?", "x", ""]]);
        assert!(matches!(
            extract_audit(&grid, None, "a.xlsx"),
            Err(AuditError::MissingConfig)
        ));
        // an empty grid fails identically: nothing is read
        assert!(matches!(
            extract_audit(&Grid::default(), None, "a.xlsx"),
            Err(AuditError::MissingConfig)
        ));
    }

    #[test]
    fn test_status_priority() {
        let grid = sheet(&[vec!["1", "¿Doble marca?", "x", "x", "x", "x"]]);
        let audit = extract_audit(&grid, Some(&config()), "a.xlsx").unwrap();
        assert_eq!(audit.items[0].status, AuditStatus::Complies);

        let grid = sheet(&[vec!["1", "¿Parcial y N/A?", "", "", "✓", "si"]]);
        let audit = extract_audit(&grid, Some(&config()), "a.xlsx").unwrap();
        assert_eq!(audit.items[0].status, AuditStatus::PartiallyComplies);
    }

    #[test]
    fn test_category_persistence() {
        let grid = sheet(&[
            vec!["1", "ORDEN Y LIMPIEZA GENERAL"],
            vec!["1", "¿Pisos limpios?", "x"],
            vec!["2", "¿Pasillos libres?", "", "x"],
            vec!["2", "EQUIPOS DE EMERGENCIA"],
            vec!["1", "¿Extintores vigentes?", "x"],
        ]);
        let audit = extract_audit(&grid, Some(&config()), "a.xlsx").unwrap();
        let categories: Vec<_> = audit.items.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(
            categories,
            vec![
                "ORDEN Y LIMPIEZA GENERAL",
                "ORDEN Y LIMPIEZA GENERAL",
                "EQUIPOS DE EMERGENCIA"
            ]
        );
        assert_eq!(audit.total_items, 3);
    }

    #[test]
    fn test_ticked_label_row_starts_category() {
        let grid = sheet(&[
            vec!["1", "ORDEN Y LIMPIEZA"],
            vec!["1", "Pisos limpios y secos", "x"],
            vec!["2", "¿Pasillo libre?", "x"],
        ]);
        let audit = extract_audit(&grid, Some(&config()), "a.xlsx").unwrap();
        assert_eq!(audit.items.len(), 1);
        assert_eq!(audit.items[0].category, "Pisos limpios y secos");
        assert_eq!(audit.items[0].question, "¿Pasillo libre?");
    }

    #[test]
    fn test_noise_rows_are_skipped() {
        let grid = sheet(&[
            vec!["", "Nota", "x"],
            vec!["1", "¿Sin marca alguna?", "", ""],
            vec!["", "", "", ""],
            vec!["2", "¿Con marca?", "", "", "", "X"],
        ]);
        let audit = extract_audit(&grid, Some(&config()), "a.xlsx").unwrap();
        assert_eq!(audit.items.len(), 1);
        assert_eq!(audit.items[0].item_number, 1);
        assert_eq!(audit.counts.not_applicable, 1);
        // everything evaluated is not applicable
        assert_eq!(audit.compliance, 0.0);
    }

    #[test]
    fn test_header_row_itself_is_not_traversed() {
        let mut config = config();
        config.header_row = Some(3);
        let grid = sheet(&[
            vec!["1", "¿Fila de encabezado?", "x"],
            vec!["2", "¿Item real?", "x"],
        ]);
        let audit = extract_audit(&grid, Some(&config), "a.xlsx").unwrap();
        assert_eq!(audit.items.len(), 1);
        assert_eq!(audit.items[0].question, "¿Item real?");
    }

    #[test]
    fn test_observation_column() {
        let mut config = config();
        config.observation = Some(6);
        let grid = sheet(&[vec!["1", "¿Botiquín completo?", "", "x", "", "", " Falta gasa "]]);
        let audit = extract_audit(&grid, Some(&config), "a.xlsx").unwrap();
        assert_eq!(audit.items[0].observation, "Falta gasa");
    }

    #[test]
    fn test_declared_cells_take_precedence() {
        let mut config = config();
        config.total_items_cell = Some(CellRef::new(0, 4));
        config.count_cells.complies = Some(CellRef::new(0, 5));
        config.compliance_cell = Some(CellRef::new(1, 4));
        config.percent_cells.fails = Some(CellRef::new(1, 5));

        let mut grid_rows = vec![
            vec!["Operación", "Planta Norte", "", "", "10", "7"],
            vec!["Fecha", "20/08/2025", "", "", "0,85", "20%"],
            vec!["N°", "ÍTEMS", "CUMPLE", "NO CUMPLE"],
        ];
        grid_rows.push(vec!["1", "¿Test A?", "x", ""]);
        grid_rows.push(vec!["2", "¿Test B?", "", "x"]);
        let grid = Grid::from_strings(&grid_rows);

        let audit = extract_audit(&grid, Some(&config), "a.xlsx").unwrap();
        assert_eq!(audit.items.len(), 2);
        assert_eq!(audit.total_items, 10);
        assert_eq!(audit.counts.complies, 7);
        // not declared: derived from items
        assert_eq!(audit.counts.fails, 1);
        assert_eq!(audit.compliance, 85.0);
        assert_eq!(audit.declared_percentages.fails, Some(20.0));
        assert_eq!(audit.declared_percentages.complies, None);
    }

    #[test]
    fn test_compliance_cell_as_percentage() {
        let mut config = config();
        config.compliance_cell = Some(CellRef::new(0, 3));
        let grid = Grid::new(vec![
            vec![
                CellValue::text("Operación"),
                CellValue::text("Planta Norte"),
                CellValue::Empty,
                CellValue::Number(66.666),
            ],
            vec![CellValue::text("Fecha"), CellValue::Number(45889.0)],
        ]);
        let audit = extract_audit(&grid, Some(&config), "a.xlsx").unwrap();
        assert_eq!(audit.compliance, 66.67);
        assert_eq!(audit.date, NaiveDate::from_ymd_opt(2025, 8, 20).unwrap());
        assert_eq!(audit.total_items, 0);
    }

    #[test]
    fn test_date_failures_are_fatal() {
        let grid = Grid::from_strings(&[
            vec!["Operación", "Planta Norte"],
            vec!["Fecha", "31/04/2024"],
            vec!["N°", "ÍTEMS", "CUMPLE"],
        ]);
        let err = extract_audit(&grid, Some(&config()), "a.xlsx").unwrap_err();
        assert!(matches!(err, AuditError::InvalidDate { ref raw, .. } if raw == "31/04/2024"));

        let grid = Grid::from_strings(&[vec!["Operación", "Planta Norte"], vec!["Fecha", ""]]);
        assert!(matches!(
            extract_audit(&grid, Some(&config()), "a.xlsx"),
            Err(AuditError::EmptyCell { field: "date", .. })
        ));
    }

    #[test]
    fn test_empty_operation_is_fatal() {
        let grid = Grid::from_strings(&[vec!["Operación", ""], vec!["Fecha", "20/08/2025"]]);
        assert!(matches!(
            extract_audit(&grid, Some(&config()), "a.xlsx"),
            Err(AuditError::EmptyCell { field: "operation", .. })
        ));
    }

    #[test]
    fn test_labelled_metadata() {
        let mut config = config();
        config.operation_cell = Some(CellRef::new(0, 0));
        config.date_cell = Some(CellRef::new(1, 0));
        config.auditor_cell = Some(CellRef::new(0, 2));
        let grid = Grid::from_strings(&[
            vec!["Operación: Planta Sur", "", "Auditor: Ana Pérez"],
            vec!["Fecha: 20 de agosto del 2025"],
        ]);
        let audit = extract_audit(&grid, Some(&config), "a.xlsx").unwrap();
        assert_eq!(audit.operation, "Planta Sur");
        assert_eq!(audit.auditor, "Ana Pérez");
        assert_eq!(audit.client, "");
        assert_eq!(audit.date, NaiveDate::from_ymd_opt(2025, 8, 20).unwrap());
    }

    #[test]
    fn test_label_value() {
        assert_eq!(label_value("Operación: Planta 1"), "Planta 1");
        assert_eq!(label_value("Operación:"), "Operación:");
        assert_eq!(label_value(" Planta 1 "), "Planta 1");
    }
}
