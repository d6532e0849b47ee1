//! Reconciler: decides insert, update or no-op for one [`SiteReport`]
//! against persisted state keyed by site id.
//!
//! - no `Data` row for the site: insert `Data`, then `Site`
//! - existing row, not a correction: no writes
//! - existing row, correction: overwrite `Data` date and both counts; `Site` untouched

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::SiteReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatement {
    CountData,
    InsertData,
    InsertSite,
    UpdateData,
}

impl StoreStatement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CountData => "count_data",
            Self::InsertData => "insert_data",
            Self::InsertSite => "insert_site",
            Self::UpdateData => "update_data",
        }
    }
}

impl std::fmt::Display for StoreStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("failed to open store connection: {0}")]
    Connection(String),

    #[error("{statement} statement failed: {message}")]
    Statement {
        statement: StoreStatement,
        message: String,
    },

    #[error("store transaction failed: {0}")]
    Transaction(String),
}

impl StoreError {
    pub fn statement(statement: StoreStatement, message: impl std::fmt::Display) -> Self {
        Self::Statement {
            statement,
            message: message.to_string(),
        }
    }
}

/// The four parameterized statements reconciliation needs from the relational store.
pub trait SiteStore {
    fn count_data_rows(&mut self, site_id: &str) -> Result<i64, StoreError>;
    fn insert_data(&mut self, report: &SiteReport) -> Result<(), StoreError>;
    fn insert_site(&mut self, report: &SiteReport) -> Result<(), StoreError>;
    fn update_data(&mut self, report: &SiteReport) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Inserted,
    Updated,
    /// A non-correction upload for a site already on record. Dropped on purpose.
    Unchanged,
}

impl ReconcileOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

pub fn reconcile(
    report: &SiteReport,
    store: &mut (impl SiteStore + ?Sized),
) -> Result<ReconcileOutcome, StoreError> {
    let existing = store.count_data_rows(&report.site_id)?;
    if existing == 0 {
        store.insert_data(report)?;
        store.insert_site(report)?;
        return Ok(ReconcileOutcome::Inserted);
    }

    if !report.is_correction {
        return Ok(ReconcileOutcome::Unchanged);
    }

    store.update_data(report)?;
    Ok(ReconcileOutcome::Updated)
}
