//! AWS-oriented adapters and handlers for vaccination-site ingest.
//!
//! This crate owns runtime integration details (the S3-triggered Lambda
//! handler, object-source and relational-store adapters, environment
//! configuration) and delegates parsing and reconciliation decisions to
//! `vaxsite_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
