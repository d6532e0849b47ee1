//! Store Gateway backed by Postgres.
//!
//! One connection per batch, one transaction per report. Each transaction
//! first takes a site-scoped advisory lock so the count-then-write decision
//! cannot interleave with a concurrent invocation for the same site.

use std::future::Future;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use vaxsite_core::reconcile::{reconcile, ReconcileOutcome, SiteStore, StoreError, StoreStatement};
use vaxsite_core::report::SiteReport;

use crate::adapters::site_gateway::SiteGateway;
use crate::config::GatewayConfig;

pub const SITE_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";
pub const COUNT_DATA_SQL: &str = "SELECT COUNT(*) FROM Data WHERE SiteID = $1";
pub const INSERT_DATA_SQL: &str =
    "INSERT INTO Data (SiteID, Date, FirstShot, SecondShot) VALUES ($1, $2, $3, $4)";
pub const INSERT_SITE_SQL: &str =
    "INSERT INTO Site (SiteID, Name, ZipCode) VALUES ($1, $2, $3) ON CONFLICT (SiteID) DO NOTHING";
pub const UPDATE_DATA_SQL: &str =
    "UPDATE Data SET Date = $2, FirstShot = $3, SecondShot = $4 WHERE SiteID = $1";

pub struct PostgresSiteGateway {
    options: PgConnectOptions,
}

impl PostgresSiteGateway {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, StoreError> {
        Ok(Self::new(config.connect_options()?))
    }
}

impl SiteGateway for PostgresSiteGateway {
    fn reconcile_batch(
        &self,
        reports: &[SiteReport],
        on_outcome: &mut dyn FnMut(&SiteReport, ReconcileOutcome),
    ) -> Result<usize, StoreError> {
        let mut connection = block_on_runtime(PgConnection::connect_with(&self.options))
            .map_err(|error| StoreError::Connection(error.to_string()))?;
        tracing::info!(
            component = "postgres_gateway",
            event = "connection_opened",
            reports = reports.len(),
            "opened store connection"
        );

        let result = reconcile_on_connection(&mut connection, reports, on_outcome);

        if let Err(error) = block_on_runtime(connection.close()) {
            tracing::warn!(
                component = "postgres_gateway",
                event = "connection_close_failed",
                error = %error,
                "failed to close store connection"
            );
        }
        result
    }
}

fn reconcile_on_connection(
    connection: &mut PgConnection,
    reports: &[SiteReport],
    on_outcome: &mut dyn FnMut(&SiteReport, ReconcileOutcome),
) -> Result<usize, StoreError> {
    let mut reconciled = 0usize;
    for report in reports {
        let mut transaction = block_on_runtime(connection.begin())
            .map_err(|error| StoreError::Transaction(error.to_string()))?;

        let decided = lock_site(&mut *transaction, &report.site_id).and_then(|()| {
            let mut store = PostgresSiteStore {
                connection: &mut *transaction,
            };
            reconcile(report, &mut store)
        });

        match decided {
            Ok(outcome) => {
                block_on_runtime(transaction.commit())
                    .map_err(|error| StoreError::Transaction(error.to_string()))?;
                on_outcome(report, outcome);
                reconciled += 1;
            }
            Err(error) => {
                if let Err(rollback_error) = block_on_runtime(transaction.rollback()) {
                    tracing::warn!(
                        component = "postgres_gateway",
                        event = "rollback_failed",
                        site_id = %report.site_id,
                        error = %rollback_error,
                        "failed to roll back site transaction"
                    );
                }
                return Err(error);
            }
        }
    }
    Ok(reconciled)
}

fn lock_site(connection: &mut PgConnection, site_id: &str) -> Result<(), StoreError> {
    block_on_runtime(sqlx::query(SITE_LOCK_SQL).bind(site_id).execute(connection))
        .map(|_| ())
        .map_err(|error| StoreError::Transaction(format!("failed to lock site {site_id}: {error}")))
}

/// [`SiteStore`] over an open transaction; every value is bound, never interpolated.
struct PostgresSiteStore<'t> {
    connection: &'t mut PgConnection,
}

impl SiteStore for PostgresSiteStore<'_> {
    fn count_data_rows(&mut self, site_id: &str) -> Result<i64, StoreError> {
        block_on_runtime(
            sqlx::query_scalar::<_, i64>(COUNT_DATA_SQL)
                .bind(site_id)
                .fetch_one(&mut *self.connection),
        )
        .map_err(|error| StoreError::statement(StoreStatement::CountData, error))
    }

    fn insert_data(&mut self, report: &SiteReport) -> Result<(), StoreError> {
        block_on_runtime(
            sqlx::query(INSERT_DATA_SQL)
                .bind(&report.site_id)
                .bind(&report.date)
                .bind(report.total_first_shots)
                .bind(report.total_second_shots)
                .execute(&mut *self.connection),
        )
        .map(|_| ())
        .map_err(|error| StoreError::statement(StoreStatement::InsertData, error))
    }

    fn insert_site(&mut self, report: &SiteReport) -> Result<(), StoreError> {
        block_on_runtime(
            sqlx::query(INSERT_SITE_SQL)
                .bind(&report.site_id)
                .bind(&report.name)
                .bind(&report.zip_code)
                .execute(&mut *self.connection),
        )
        .map(|_| ())
        .map_err(|error| StoreError::statement(StoreStatement::InsertSite, error))
    }

    fn update_data(&mut self, report: &SiteReport) -> Result<(), StoreError> {
        block_on_runtime(
            sqlx::query(UPDATE_DATA_SQL)
                .bind(&report.site_id)
                .bind(&report.date)
                .bind(report.total_first_shots)
                .bind(report.total_second_shots)
                .execute(&mut *self.connection),
        )
        .map(|_| ())
        .map_err(|error| StoreError::statement(StoreStatement::UpdateData, error))
    }
}

fn block_on_runtime<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(sql: &str) -> Vec<usize> {
        let mut found: Vec<usize> = sql
            .split('$')
            .skip(1)
            .filter_map(|rest| {
                let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            })
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    #[test]
    fn statements_bind_every_value() {
        assert_eq!(placeholders(SITE_LOCK_SQL), vec![1]);
        assert_eq!(placeholders(COUNT_DATA_SQL), vec![1]);
        assert_eq!(placeholders(INSERT_DATA_SQL), vec![1, 2, 3, 4]);
        assert_eq!(placeholders(INSERT_SITE_SQL), vec![1, 2, 3]);
        assert_eq!(placeholders(UPDATE_DATA_SQL), vec![1, 2, 3, 4]);
        for sql in [COUNT_DATA_SQL, INSERT_DATA_SQL, INSERT_SITE_SQL, UPDATE_DATA_SQL] {
            assert!(!sql.contains('\''), "statement should not embed literals: {sql}");
        }
    }

    #[test]
    fn site_insert_never_rewrites_an_existing_site() {
        assert!(INSERT_SITE_SQL.ends_with("ON CONFLICT (SiteID) DO NOTHING"));
        assert!(!INSERT_SITE_SQL.contains("DO UPDATE"));
    }

    #[test]
    fn update_touches_only_data_columns() {
        assert!(UPDATE_DATA_SQL.starts_with("UPDATE Data SET"));
        assert!(UPDATE_DATA_SQL.contains("Date = $2"));
        assert!(UPDATE_DATA_SQL.contains("FirstShot = $3"));
        assert!(UPDATE_DATA_SQL.contains("SecondShot = $4"));
        assert!(UPDATE_DATA_SQL.ends_with("WHERE SiteID = $1"));
    }

    #[test]
    fn gateway_rejects_invalid_configuration() {
        let config = GatewayConfig {
            database_url: Some("::".to_string()),
            application_name: "test".to_string(),
        };

        let error = match PostgresSiteGateway::from_config(&config) {
            Ok(_) => panic!("invalid url should not build a gateway"),
            Err(error) => error,
        };
        assert!(matches!(error, StoreError::Connection(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_store_reports_connection_error() {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("postgres")
            .database("vaxsite");
        let gateway = PostgresSiteGateway::new(options);
        let mut outcomes = Vec::new();

        let error = gateway
            .reconcile_batch(&[], &mut |_, outcome| outcomes.push(outcome))
            .expect_err("nothing listens on port 1");

        assert!(matches!(error, StoreError::Connection(_)));
        assert!(outcomes.is_empty());
    }
}
