//! In-memory [`SiteStore`] mirroring the `Site` and `Data` tables, for tests.

use crate::reconcile::{SiteStore, StoreError, StoreStatement};
use crate::report::SiteReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    pub site_id: String,
    pub date: String,
    pub first_shot: i32,
    pub second_shot: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRow {
    pub site_id: String,
    pub name: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySiteStore {
    data: Vec<DataRow>,
    sites: Vec<SiteRow>,
    statements: Vec<StoreStatement>,
    fail_on: Option<StoreStatement>,
}

impl InMemorySiteStore {
    pub fn failing_on(statement: StoreStatement) -> Self {
        Self {
            fail_on: Some(statement),
            ..Self::default()
        }
    }

    pub fn with_data_row(mut self, row: DataRow) -> Self {
        self.data.push(row);
        self
    }

    pub fn with_site_row(mut self, row: SiteRow) -> Self {
        self.sites.push(row);
        self
    }

    pub fn data_rows(&self) -> Vec<DataRow> {
        self.data.clone()
    }

    pub fn site_rows(&self) -> Vec<SiteRow> {
        self.sites.clone()
    }

    /// Statements executed so far, in order, including the one that failed.
    pub fn statements(&self) -> Vec<StoreStatement> {
        self.statements.clone()
    }

    pub fn clear_statements(&mut self) {
        self.statements.clear();
    }

    fn record(&mut self, statement: StoreStatement) -> Result<(), StoreError> {
        self.statements.push(statement);
        if self.fail_on == Some(statement) {
            return Err(StoreError::statement(
                statement,
                format!("injected {statement} failure"),
            ));
        }
        Ok(())
    }
}

impl SiteStore for InMemorySiteStore {
    fn count_data_rows(&mut self, site_id: &str) -> Result<i64, StoreError> {
        self.record(StoreStatement::CountData)?;
        let count = self.data.iter().filter(|row| row.site_id == site_id).count();
        Ok(count as i64)
    }

    fn insert_data(&mut self, report: &SiteReport) -> Result<(), StoreError> {
        self.record(StoreStatement::InsertData)?;
        self.data.push(DataRow {
            site_id: report.site_id.clone(),
            date: report.date.clone(),
            first_shot: report.total_first_shots,
            second_shot: report.total_second_shots,
        });
        Ok(())
    }

    fn insert_site(&mut self, report: &SiteReport) -> Result<(), StoreError> {
        self.record(StoreStatement::InsertSite)?;
        if self.sites.iter().any(|row| row.site_id == report.site_id) {
            return Ok(());
        }
        self.sites.push(SiteRow {
            site_id: report.site_id.clone(),
            name: report.name.clone(),
            zip_code: report.zip_code.clone(),
        });
        Ok(())
    }

    fn update_data(&mut self, report: &SiteReport) -> Result<(), StoreError> {
        self.record(StoreStatement::UpdateData)?;
        for row in self
            .data
            .iter_mut()
            .filter(|row| row.site_id == report.site_id)
        {
            row.date = report.date.clone();
            row.first_shot = report.total_first_shots;
            row.second_shot = report.total_second_shots;
        }
        Ok(())
    }
}
