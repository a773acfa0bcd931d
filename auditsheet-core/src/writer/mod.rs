// ! Writer module for exporting audit items to a flat spreadsheet

mod xlsx_writer;

pub use xlsx_writer::write_grid_xlsx;

use crate::model::AuditFile;
use crate::reader::CellValue;
use anyhow::{Context, Result};
use std::path::Path;

/// Worksheet name of the export
pub const EXPORT_SHEET: &str = "Auditorías";

/// Fixed column order of the export
pub const EXPORT_HEADERS: [&str; 13] = [
    "ID",
    "Operación",
    "Responsable",
    "Cliente",
    "Fecha",
    "Auditor",
    "Categoría",
    "N° Ítem",
    "Pregunta",
    "Estado",
    "Observación",
    "Oportunidad de mejora",
    "Normativa",
];

/// One header row plus one row per item, dates as `DD/MM/YYYY`
pub fn item_rows(files: &[AuditFile]) -> Vec<Vec<CellValue>> {
    let header: Vec<CellValue> = EXPORT_HEADERS.iter().map(|h| CellValue::text(*h)).collect();
    let mut rows: Vec<Vec<CellValue>> = vec![header];
    for file in files {
        for item in &file.items {
            rows.push(vec![
                CellValue::text(item.id.as_str()),
                CellValue::text(item.operation.as_str()),
                CellValue::text(item.responsible.as_str()),
                CellValue::text(item.client.as_str()),
                CellValue::text(item.date.format("%d/%m/%Y").to_string()),
                CellValue::text(item.auditor.as_str()),
                CellValue::text(item.category.as_str()),
                CellValue::Number(f64::from(item.item_number)),
                CellValue::text(item.question.as_str()),
                CellValue::text(item.status.as_str()),
                CellValue::text(item.observation.as_str()),
                CellValue::text(item.improvement_opportunity.as_str()),
                CellValue::text(item.regulation.as_str()),
            ]);
        }
    }
    rows
}

/// Export every item of `files` as XLSX bytes
pub fn export_items_xlsx(files: &[AuditFile]) -> Result<Vec<u8>> {
    write_grid_xlsx(EXPORT_SHEET, &item_rows(files))
}

/// Export every item of `files` to an XLSX file
pub fn export_items<P: AsRef<Path>>(files: &[AuditFile], output_path: P) -> Result<()> {
    let output = output_path.as_ref();
    let bytes = export_items_xlsx(files)?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write export: {}", output.display()))
}
