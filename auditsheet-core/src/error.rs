//! Error taxonomy for audit extraction

use crate::reader::CellRef;
use thiserror::Error;

/// Failures that abort a single extraction attempt.
///
/// Rows that are skipped during traversal (short question text, no status
/// marker, category headers) are not errors and never surface here.
#[derive(Debug, Error)]
pub enum AuditError {
    /// No column configuration has been stored or supplied
    #[error("no column configuration found; configure the checklist layout before importing")]
    MissingConfig,

    /// A mandatory column index or the header row is not set
    #[error("column configuration is incomplete: `{0}` is not set")]
    IncompleteConfig(&'static str),

    /// A mandatory metadata cell (operation or date) is not mapped
    #[error("column configuration does not map the {0} cell")]
    UnmappedCell(&'static str),

    /// A mandatory metadata cell is mapped but holds no value
    #[error("{field} cell {cell} is empty")]
    EmptyCell { field: &'static str, cell: CellRef },

    /// The audit date could not be parsed into a supported calendar date
    #[error("could not parse audit date {raw:?} in cell {cell}")]
    InvalidDate { cell: CellRef, raw: String },

    /// No row carries any of the header marker tokens
    #[error("no header row containing any of {tokens:?} was found")]
    HeaderNotFound { tokens: Vec<String> },

    #[error("worksheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("workbook contains no worksheets")]
    EmptyWorkbook,

    #[error("failed to decode workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AuditError {
    /// Whether the error comes from the column configuration rather than the file
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            AuditError::MissingConfig
                | AuditError::IncompleteConfig(_)
                | AuditError::UnmappedCell(_)
        )
    }
}
