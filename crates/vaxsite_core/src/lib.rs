//! Vaccination-site ingest domain primitives.
//!
//! This crate owns payload normalization (XML and JSON into [`report::SiteReport`]),
//! shot aggregation and the insert/update/no-op reconciliation decision. It
//! intentionally excludes AWS SDK, Lambda runtime and database driver concerns;
//! persistence is reached only through the [`reconcile::SiteStore`] port.

pub mod aggregate;
pub mod contract;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod parser;
pub mod reconcile;
pub mod report;
