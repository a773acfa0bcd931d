//! Column configuration: where the semantic fields of a checklist live

use crate::error::AuditError;
use crate::model::AuditStatus;
use crate::reader::CellRef;
use serde::{Deserialize, Serialize};

/// Optional cell per status, used for declared counts and percentages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCells {
    #[serde(default, rename = "cumple", skip_serializing_if = "Option::is_none")]
    pub complies: Option<CellRef>,
    #[serde(default, rename = "cumpleParcial", skip_serializing_if = "Option::is_none")]
    pub partial: Option<CellRef>,
    #[serde(default, rename = "noCumple", skip_serializing_if = "Option::is_none")]
    pub fails: Option<CellRef>,
    #[serde(default, rename = "noAplica", skip_serializing_if = "Option::is_none")]
    pub not_applicable: Option<CellRef>,
}

impl StatusCells {
    pub fn get(&self, status: AuditStatus) -> Option<CellRef> {
        match status {
            AuditStatus::Complies => self.complies,
            AuditStatus::PartiallyComplies => self.partial,
            AuditStatus::DoesNotComply => self.fails,
            AuditStatus::NotApplicable => self.not_applicable,
        }
    }
}

/// Persisted mapping for one checklist layout family.
///
/// Everything is optional at rest so a half-finished configuration can be
/// stored and edited; [`ColumnConfig::validate`] decides whether it is
/// usable for extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConfig {
    pub question: Option<u32>,
    pub cumple: Option<u32>,
    pub cumple_parcial: Option<u32>,
    pub no_cumple: Option<u32>,
    pub no_aplica: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<u32>,
    pub header_row: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_cell: Option<CellRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items_cell: Option<CellRef>,
    #[serde(default)]
    pub count_cells: StatusCells,
    #[serde(default)]
    pub percent_cells: StatusCells,

    pub operation_cell: Option<CellRef>,
    pub date_cell: Option<CellRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_cell: Option<CellRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cell: Option<CellRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditor_cell: Option<CellRef>,
}

impl ColumnConfig {
    /// Preset for the legacy checklist template.
    ///
    /// Metadata sits in column B of rows 3-7, the table header on row 9 and
    /// the item columns run B (question) through G (observation).
    pub fn legacy() -> Self {
        Self {
            question: Some(1),
            cumple: Some(2),
            cumple_parcial: Some(3),
            no_cumple: Some(4),
            no_aplica: Some(5),
            observation: Some(6),
            header_row: Some(8),
            operation_cell: Some(CellRef::new(2, 1)),
            date_cell: Some(CellRef::new(3, 1)),
            responsible_cell: Some(CellRef::new(4, 1)),
            client_cell: Some(CellRef::new(5, 1)),
            auditor_cell: Some(CellRef::new(6, 1)),
            ..Self::default()
        }
    }

    /// Parse a serialized configuration blob
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Check completeness and produce the layout used by extraction.
    ///
    /// Core columns and the header row are checked first, then the operation
    /// and date cells, so the error names the first missing piece.
    pub fn validate(&self) -> Result<ColumnLayout, AuditError> {
        let question = required(self.question, "question")?;
        let complies = required(self.cumple, "cumple")?;
        let partial = required(self.cumple_parcial, "cumpleParcial")?;
        let fails = required(self.no_cumple, "noCumple")?;
        let not_applicable = required(self.no_aplica, "noAplica")?;
        let header_row = required(self.header_row, "headerRow")?;

        let operation_cell = self.operation_cell.ok_or(AuditError::UnmappedCell("operation"))?;
        let date_cell = self.date_cell.ok_or(AuditError::UnmappedCell("date"))?;

        Ok(ColumnLayout {
            question,
            status_columns: [
                (AuditStatus::Complies, complies),
                (AuditStatus::PartiallyComplies, partial),
                (AuditStatus::DoesNotComply, fails),
                (AuditStatus::NotApplicable, not_applicable),
            ],
            observation: self.observation,
            header_row,
            operation_cell,
            date_cell,
            responsible_cell: self.responsible_cell,
            client_cell: self.client_cell,
            auditor_cell: self.auditor_cell,
            compliance_cell: self.compliance_cell,
            total_items_cell: self.total_items_cell,
            count_cells: self.count_cells,
            percent_cells: self.percent_cells,
        })
    }
}

fn required(value: Option<u32>, field: &'static str) -> Result<u32, AuditError> {
    value.ok_or(AuditError::IncompleteConfig(field))
}

/// A validated configuration with every mandatory coordinate present
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub question: u32,
    /// Marker columns in priority order
    pub status_columns: [(AuditStatus, u32); 4],
    pub observation: Option<u32>,
    pub header_row: u32,
    pub operation_cell: CellRef,
    pub date_cell: CellRef,
    pub responsible_cell: Option<CellRef>,
    pub client_cell: Option<CellRef>,
    pub auditor_cell: Option<CellRef>,
    pub compliance_cell: Option<CellRef>,
    pub total_items_cell: Option<CellRef>,
    pub count_cells: StatusCells,
    pub percent_cells: StatusCells,
}

impl ColumnLayout {
    /// Validate an optional configuration; absence is a hard failure
    pub fn resolve(config: Option<&ColumnConfig>) -> Result<Self, AuditError> {
        config.ok_or(AuditError::MissingConfig)?.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ColumnConfig {
        ColumnConfig {
            question: Some(1),
            cumple: Some(2),
            cumple_parcial: Some(4),
            no_cumple: Some(3),
            no_aplica: Some(5),
            header_row: Some(2),
            operation_cell: Some(CellRef::new(0, 1)),
            date_cell: Some(CellRef::new(1, 1)),
            ..ColumnConfig::default()
        }
    }

    #[test]
    fn test_missing_config_is_fatal() {
        assert!(matches!(
            ColumnLayout::resolve(None),
            Err(AuditError::MissingConfig)
        ));
    }

    #[test]
    fn test_validation_names_missing_field() {
        let mut config = complete();
        config.no_aplica = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AuditError::IncompleteConfig("noAplica")));
        assert!(err.to_string().contains("noAplica"));

        let mut config = complete();
        config.header_row = None;
        assert!(matches!(
            config.validate(),
            Err(AuditError::IncompleteConfig("headerRow"))
        ));
    }

    #[test]
    fn test_validation_requires_operation_and_date_cells() {
        let mut config = complete();
        config.date_cell = None;
        assert!(matches!(config.validate(), Err(AuditError::UnmappedCell("date"))));

        let mut config = complete();
        config.operation_cell = None;
        assert!(matches!(
            config.validate(),
            Err(AuditError::UnmappedCell("operation"))
        ));
    }

    #[test]
    fn test_layout_keeps_priority_order() {
        let layout = complete().validate().unwrap();
        let statuses: Vec<_> = layout.status_columns.iter().map(|(s, _)| *s).collect();
        assert_eq!(statuses, AuditStatus::PRIORITY.to_vec());
        assert_eq!(layout.status_columns[1], (AuditStatus::PartiallyComplies, 4));
    }

    #[test]
    fn test_json_round_trip_and_wire_names() {
        let mut config = complete();
        config.count_cells.fails = Some(CellRef::new(40, 3));
        let json = config.to_json().unwrap();
        assert!(json.contains("\"cumpleParcial\": 4"));
        assert!(json.contains("\"headerRow\": 2"));
        assert!(json.contains("\"noCumple\": {"));
        assert_eq!(ColumnConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_negative_index_is_malformed() {
        let json = r#"{"question": -1, "cumple": 2}"#;
        assert!(ColumnConfig::from_json(json).is_err());
    }

    #[test]
    fn test_legacy_preset_is_complete() {
        assert!(ColumnConfig::legacy().validate().is_ok());
    }
}
