use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;
use vaxsite_core::reconcile::StoreError;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const APPLICATION_NAME_ENV: &str = "VAXSITE_DB_APPLICATION_NAME";
pub const DEFAULT_APPLICATION_NAME: &str = "vaxsite-ingest";

/// Relational store settings, read from the Lambda environment once per invocation.
///
/// Without `DATABASE_URL` the standard `PGHOST`/`PGPORT`/`PGDATABASE`/`PGUSER`/`PGPASSWORD`
/// variables apply. TLS follows `sslmode` in the URL or `PGSSLMODE`; `require` is
/// needed for RDS instances that force SSL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub database_url: Option<String>,
    pub application_name: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            database_url: non_blank(DATABASE_URL_ENV),
            application_name: non_blank(APPLICATION_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string()),
        }
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, StoreError> {
        let options = match &self.database_url {
            Some(url) => PgConnectOptions::from_str(url).map_err(|error| {
                StoreError::Connection(format!("invalid {DATABASE_URL_ENV}: {error}"))
            })?,
            None => PgConnectOptions::new(),
        };
        Ok(options.application_name(&self.application_name))
    }
}
