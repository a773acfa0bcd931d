//! Audit records produced by extraction

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compliance state asserted for one checklist question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditStatus {
    #[serde(rename = "Cumple")]
    Complies,
    #[serde(rename = "Cumple parcialmente")]
    PartiallyComplies,
    #[serde(rename = "No cumple")]
    DoesNotComply,
    #[serde(rename = "No aplica")]
    NotApplicable,
}

impl AuditStatus {
    /// Order in which marker columns are checked; the first marked column wins
    pub const PRIORITY: [AuditStatus; 4] = [
        AuditStatus::Complies,
        AuditStatus::PartiallyComplies,
        AuditStatus::DoesNotComply,
        AuditStatus::NotApplicable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Complies => "Cumple",
            AuditStatus::PartiallyComplies => "Cumple parcialmente",
            AuditStatus::DoesNotComply => "No cumple",
            AuditStatus::NotApplicable => "No aplica",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-status item counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "cumple")]
    pub complies: u32,
    #[serde(rename = "cumpleParcial")]
    pub partial: u32,
    #[serde(rename = "noCumple")]
    pub fails: u32,
    #[serde(rename = "noAplica")]
    pub not_applicable: u32,
}

impl StatusCounts {
    pub fn get(&self, status: AuditStatus) -> u32 {
        match status {
            AuditStatus::Complies => self.complies,
            AuditStatus::PartiallyComplies => self.partial,
            AuditStatus::DoesNotComply => self.fails,
            AuditStatus::NotApplicable => self.not_applicable,
        }
    }

    pub fn get_mut(&mut self, status: AuditStatus) -> &mut u32 {
        match status {
            AuditStatus::Complies => &mut self.complies,
            AuditStatus::PartiallyComplies => &mut self.partial,
            AuditStatus::DoesNotComply => &mut self.fails,
            AuditStatus::NotApplicable => &mut self.not_applicable,
        }
    }

    pub fn record(&mut self, status: AuditStatus) {
        *self.get_mut(status) += 1;
    }

    pub fn add(&mut self, other: &StatusCounts) {
        for status in AuditStatus::PRIORITY {
            *self.get_mut(status) += other.get(status);
        }
    }

    pub fn sum(&self) -> u32 {
        self.complies + self.partial + self.fails + self.not_applicable
    }

    /// Count the statuses of a sequence of items
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a AuditItem>) -> Self {
        let mut counts = Self::default();
        for item in items {
            counts.record(item.status);
        }
        counts
    }
}

/// Raw percentages read from the sheet's own summary cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPercentages {
    #[serde(rename = "cumple")]
    pub complies: Option<f64>,
    #[serde(rename = "cumpleParcial")]
    pub partial: Option<f64>,
    #[serde(rename = "noCumple")]
    pub fails: Option<f64>,
    #[serde(rename = "noAplica")]
    pub not_applicable: Option<f64>,
}

/// One evaluated checklist question within one audit run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditItem {
    /// `<file name>-<item number>`
    pub id: String,
    pub operation: String,
    pub responsible: String,
    pub client: String,
    pub date: NaiveDate,
    pub auditor: String,
    pub category: String,
    pub item_number: u32,
    pub question: String,
    pub status: AuditStatus,
    pub observation: String,
    /// Not populated by extraction
    pub improvement_opportunity: String,
    /// Not populated by extraction
    pub regulation: String,
}

/// One parsed spreadsheet run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFile {
    pub file_name: String,
    pub operation: String,
    pub responsible: String,
    pub client: String,
    pub date: NaiveDate,
    pub auditor: String,
    pub items: Vec<AuditItem>,
    /// 0-100, two decimals
    pub compliance: f64,
    pub total_items: u32,
    #[serde(flatten)]
    pub counts: StatusCounts,
    #[serde(default)]
    pub declared_percentages: StatusPercentages,
}

impl AuditFile {
    /// `YYYY-MM` grouping key of the audit date
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted compliance: partial items earn half credit and not-applicable
/// items leave the denominator. An empty denominator yields 0.
pub fn compliance_percentage(counts: &StatusCounts, total_items: u32) -> f64 {
    let evaluated = total_items.saturating_sub(counts.not_applicable);
    if evaluated == 0 {
        return 0.0;
    }
    let score = f64::from(counts.complies) + f64::from(counts.partial) * 0.5;
    round2(score / f64::from(evaluated) * 100.0)
}
