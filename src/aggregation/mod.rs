//! Period aggregation and reconciliation.
//!
//! This module folds per-employee outcomes into company-period BPJS
//! summaries, employee tax-year summaries and company-period flat-rate
//! tables through the [`SummaryStore`] capability, and checks the result
//! with the [`ComponentReconciler`].

mod aggregator;
mod reconciler;
mod store;

pub use aggregator::{AggregationReport, CancellationReport, PeriodAggregator};
pub use reconciler::ComponentReconciler;
pub use store::{InMemorySummaryStore, SummaryStore};
