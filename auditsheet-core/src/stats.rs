//! Aggregate compliance statistics over a collection of audit files

use crate::model::{AuditFile, AuditStatus, StatusCounts};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Number of entries in the most-failed ranking
pub const TOP_FAILED_LIMIT: usize = 10;

/// Bucket key for files without an auditor name
pub const UNASSIGNED_AUDITOR: &str = "Sin auditor";

/// One grouping bucket (operation, auditor or month)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroupStats {
    /// Sum of the files' item totals
    #[serde(rename = "total")]
    pub total_items: u32,
    /// Mean compliance of the files in the bucket
    #[serde(rename = "cumplimiento")]
    pub compliance: f64,
    /// Number of files in the bucket
    #[serde(rename = "auditorias")]
    pub audits: u32,
}

impl GroupStats {
    /// Fold one more file into the running average
    pub fn absorb(&mut self, compliance: f64, total_items: u32) {
        let count = f64::from(self.audits);
        self.compliance = (self.compliance * count + compliance) / (count + 1.0);
        self.audits += 1;
        self.total_items += total_items;
    }
}

/// A question ranked by how often it was marked "No cumple"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub category: String,
    pub question: String,
    pub count: u32,
}

/// Aggregate view over the current collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total_audits: u32,
    /// Sum of per-file totals (declared totals included)
    pub total_items: u32,
    pub average_compliance: f64,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub by_operation: BTreeMap<String, GroupStats>,
    pub by_auditor: BTreeMap<String, GroupStats>,
    /// Keyed by `YYYY-MM`
    pub by_month: BTreeMap<String, GroupStats>,
    pub top_failed_items: Vec<FailedItem>,
}

/// Selects which files enter an aggregation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub operation: Option<String>,
    pub auditor: Option<String>,
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to: Option<NaiveDate>,
}

impl AuditFilter {
    pub fn matches(&self, file: &AuditFile) -> bool {
        self.operation
            .as_deref()
            .is_none_or(|op| file.operation.eq_ignore_ascii_case(op))
            && self
                .auditor
                .as_deref()
                .is_none_or(|a| file.auditor.eq_ignore_ascii_case(a))
            && self.from.is_none_or(|from| file.date >= from)
            && self.to.is_none_or(|to| file.date <= to)
    }

    pub fn apply<'a>(&'a self, files: &'a [AuditFile]) -> impl Iterator<Item = &'a AuditFile> {
        files.iter().filter(move |f| self.matches(f))
    }
}

/// Compute statistics over a set of files
pub fn compute_stats<'a>(files: impl IntoIterator<Item = &'a AuditFile>) -> AuditStats {
    let mut stats = AuditStats::default();
    let mut overall = GroupStats::default();
    let mut failed = FailureRanking::default();

    for file in files {
        stats.total_audits += 1;
        stats.total_items += file.total_items;
        stats.counts.add(&file.counts);
        overall.absorb(file.compliance, file.total_items);

        let auditor = if file.auditor.is_empty() {
            UNASSIGNED_AUDITOR
        } else {
            file.auditor.as_str()
        };
        for (groups, key) in [
            (&mut stats.by_operation, file.operation.clone()),
            (&mut stats.by_auditor, auditor.to_string()),
            (&mut stats.by_month, file.month_key()),
        ] {
            groups
                .entry(key)
                .or_default()
                .absorb(file.compliance, file.total_items);
        }

        for item in &file.items {
            if item.status == AuditStatus::DoesNotComply {
                failed.record(&item.category, &item.question);
            }
        }
    }

    stats.average_compliance = overall.compliance;
    stats.top_failed_items = failed.top(TOP_FAILED_LIMIT);
    stats
}

/// Failure counts per (category, question), in first-seen order
#[derive(Debug, Default)]
struct FailureRanking {
    entries: Vec<FailedItem>,
    index: HashMap<(String, String), usize>,
}

impl FailureRanking {
    fn record(&mut self, category: &str, question: &str) {
        let key = (category.to_string(), question.to_string());
        match self.index.get(&key) {
            Some(&idx) => self.entries[idx].count += 1,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(FailedItem {
                    category: category.to_string(),
                    question: question.to_string(),
                    count: 1,
                });
            }
        }
    }

    fn top(mut self, limit: usize) -> Vec<FailedItem> {
        // stable: ties keep first-seen order
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(limit);
        self.entries
    }
}

/// Number of audits per day, keyed by `YYYY-MM-DD`
pub fn calendar<'a>(files: impl IntoIterator<Item = &'a AuditFile>) -> BTreeMap<String, u32> {
    let mut days = BTreeMap::new();
    for file in files {
        *days.entry(file.date.format("%Y-%m-%d").to_string()).or_insert(0) += 1;
    }
    days
}
