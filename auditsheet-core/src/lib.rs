//! auditsheet-core: checklist audit extraction for spreadsheet files
//!
//! Reads workplace safety/hygiene checklist workbooks, extracts one typed
//! record per evaluated question using a user-supplied column configuration,
//! and aggregates compliance across operations, auditors and months.

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod reader;
pub mod session;
pub mod settings;
pub mod stats;
pub mod store;
pub mod writer;

use std::path::Path;

pub use config::{ColumnConfig, ColumnLayout};
pub use error::AuditError;
pub use model::{AuditFile, AuditItem, AuditStatus, StatusCounts};
pub use session::{AuditSession, BatchOutcome, SourceFile};
pub use settings::Settings;
pub use stats::{AuditFilter, AuditStats};

/// Main extraction interface
#[derive(Debug, Clone, Default)]
pub struct AuditParser {
    settings: Settings,
}

impl AuditParser {
    /// Create a parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Decode the configured worksheet of a workbook
    pub fn read_grid(&self, bytes: &[u8]) -> Result<reader::Grid, AuditError> {
        reader::read_grid_from_bytes(bytes, self.settings.sheet.as_deref())
    }

    /// Parse workbook bytes into an audit file.
    ///
    /// The configuration is validated before the workbook is decoded.
    pub fn parse_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
        config: Option<&ColumnConfig>,
    ) -> Result<AuditFile, AuditError> {
        let layout = ColumnLayout::resolve(config)?;
        let grid = self.read_grid(bytes)?;
        extract::extract_with_layout(&grid, &layout, file_name)
    }

    /// Parse a workbook file, named after its final path component
    pub fn parse_file<P: AsRef<Path>>(
        &self,
        path: P,
        config: Option<&ColumnConfig>,
    ) -> Result<AuditFile, AuditError> {
        let path = path.as_ref();
        let layout = ColumnLayout::resolve(config)?;
        let grid = reader::read_grid(path, self.settings.sheet.as_deref())?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        extract::extract_with_layout(&grid, &layout, &name)
    }

    /// Propose a column configuration from a workbook's header captions
    pub fn suggest_config(&self, bytes: &[u8]) -> Result<ColumnConfig, AuditError> {
        let grid = self.read_grid(bytes)?;
        detect::suggest_config(&grid, self.settings.header_tokens.as_slice())
    }
}
