use vaxsite_core::reconcile::{ReconcileOutcome, StoreError};
use vaxsite_core::report::SiteReport;

/// Executes reconciliation for a batch of reports against the relational store.
///
/// Implementations acquire one connection for the batch and release it on
/// every exit path. The first store error abandons the remaining reports.
pub trait SiteGateway {
    fn reconcile_batch(
        &self,
        reports: &[SiteReport],
        on_outcome: &mut dyn FnMut(&SiteReport, ReconcileOutcome),
    ) -> Result<usize, StoreError>;
}
