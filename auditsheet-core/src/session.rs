//! In-memory audit collection with batch import and re-parse
//!
//! Files are processed one at a time in input order. The collection is only
//! ever replaced wholesale: a batch is accepted or dropped as a unit and a
//! re-parse that yields no successes leaves the collection untouched.

use crate::AuditParser;
use crate::config::ColumnConfig;
use crate::error::AuditError;
use crate::model::AuditFile;
use crate::stats::{self, AuditFilter, AuditStats};
use anyhow::{Context, Result};
use std::path::Path;

/// Raw bytes of one uploaded spreadsheet, keyed by its file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it after its final path component
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

/// A file that failed to parse, with the reason
#[derive(Debug)]
pub struct FileFailure {
    pub file_name: String,
    pub error: AuditError,
}

/// A successfully parsed file together with its source bytes
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub audit: AuditFile,
    pub source: SourceFile,
}

/// Per-file results of one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub parsed: Vec<ParsedFile>,
    pub failures: Vec<FileFailure>,
}

impl BatchOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }
}

/// Parse a batch sequentially; a failing file does not stop the others
pub fn parse_batch(
    parser: &AuditParser,
    sources: Vec<SourceFile>,
    config: Option<&ColumnConfig>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for source in sources {
        match parser.parse_bytes(&source.name, &source.bytes, config) {
            Ok(audit) => outcome.parsed.push(ParsedFile { audit, source }),
            Err(error) => {
                log::warn!("{}: {}", source.name, error);
                outcome.failures.push(FileFailure {
                    file_name: source.name,
                    error,
                });
            }
        }
    }
    outcome
}

/// Result of re-running extraction over every stored source
#[derive(Debug, Default)]
pub struct ReparseReport {
    pub succeeded: usize,
    pub failures: Vec<FileFailure>,
    /// Whether the collection was replaced
    pub replaced: bool,
}

/// The current audit collection and the bytes it was parsed from
#[derive(Debug, Clone, Default)]
pub struct AuditSession {
    files: Vec<AuditFile>,
    sources: Vec<SourceFile>,
}

impl AuditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from stored sources; call [`AuditSession::reparse`] to populate files
    pub fn with_sources(sources: Vec<SourceFile>) -> Self {
        Self {
            files: Vec::new(),
            sources,
        }
    }

    pub fn files(&self) -> &[AuditFile] {
        &self.files
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Add the successful part of a batch.
    ///
    /// Files already loaded under the same name are replaced. Returns the
    /// number of files added.
    pub fn accept(&mut self, outcome: BatchOutcome) -> usize {
        let added = outcome.parsed.len();
        if added == 0 {
            return 0;
        }
        let incoming = |name: &str| outcome.parsed.iter().any(|p| p.source.name == name);

        let mut files: Vec<AuditFile> = self
            .files
            .iter()
            .filter(|f| !incoming(&f.file_name))
            .cloned()
            .collect();
        let mut sources: Vec<SourceFile> = self
            .sources
            .iter()
            .filter(|s| !incoming(&s.name))
            .cloned()
            .collect();
        for parsed in outcome.parsed {
            files.push(parsed.audit);
            sources.push(parsed.source);
        }

        self.files = files;
        self.sources = sources;
        added
    }

    /// Re-run extraction over every stored source with `config`.
    ///
    /// On at least one success the collection becomes exactly the successful
    /// files; sources are kept either way so a later re-parse can retry.
    pub fn reparse(
        &mut self,
        parser: &AuditParser,
        config: Option<&ColumnConfig>,
    ) -> ReparseReport {
        let outcome = parse_batch(parser, self.sources.clone(), config);
        let succeeded = outcome.parsed.len();
        let replaced = succeeded > 0;
        if replaced {
            self.files = outcome.parsed.into_iter().map(|p| p.audit).collect();
        } else {
            log::warn!("Re-parse produced no files; keeping the current collection");
        }
        ReparseReport {
            succeeded,
            failures: outcome.failures,
            replaced,
        }
    }

    /// Drop every file and source
    pub fn clear(&mut self) {
        self.files = Vec::new();
        self.sources = Vec::new();
    }

    pub fn stats(&self, filter: &AuditFilter) -> AuditStats {
        stats::compute_stats(filter.apply(&self.files))
    }
}
