//! Storage capability for period summaries.
//!
//! The engine never persists anything itself. It loads a summary through
//! [`SummaryStore`], mutates its copy, and hands it back. Callers are
//! expected to serialize aggregation calls per summary key.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::models::{
    BpjsPeriodSummary, EmployeeTaxYearSummary, FlatRateCompanyPeriod, PeriodKey, TaxYearKey,
};

/// Load and save operations for the three summary kinds.
pub trait SummaryStore: Send + Sync {
    /// BPJS summary of a company-period, if one exists.
    fn load_bpjs(&self, key: &PeriodKey) -> Option<BpjsPeriodSummary>;

    /// Creates or replaces a BPJS summary.
    fn save_bpjs(&self, summary: BpjsPeriodSummary);

    /// Tax-year summary of an employee, if one exists.
    fn load_tax_year(&self, key: &TaxYearKey) -> Option<EmployeeTaxYearSummary>;

    /// Creates or replaces a tax-year summary.
    fn save_tax_year(&self, summary: EmployeeTaxYearSummary);

    /// Flat-rate table of a company-period, if one exists.
    fn load_flat_rate(&self, key: &PeriodKey) -> Option<FlatRateCompanyPeriod>;

    /// Creates or replaces a flat-rate table.
    fn save_flat_rate(&self, summary: FlatRateCompanyPeriod);
}

/// [`SummaryStore`] keeping everything in process memory.
#[derive(Debug, Default)]
pub struct InMemorySummaryStore {
    bpjs: Mutex<HashMap<PeriodKey, BpjsPeriodSummary>>,
    tax_years: Mutex<HashMap<TaxYearKey, EmployeeTaxYearSummary>>,
    flat_rates: Mutex<HashMap<PeriodKey, FlatRateCompanyPeriod>>,
}

impl InMemorySummaryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of summaries of each kind: (BPJS, tax-year, flat-rate).
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.bpjs.lock().unwrap_or_else(PoisonError::into_inner).len(),
            self.tax_years.lock().unwrap_or_else(PoisonError::into_inner).len(),
            self.flat_rates.lock().unwrap_or_else(PoisonError::into_inner).len(),
        )
    }
}

impl SummaryStore for InMemorySummaryStore {
    fn load_bpjs(&self, key: &PeriodKey) -> Option<BpjsPeriodSummary> {
        self.bpjs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save_bpjs(&self, summary: BpjsPeriodSummary) {
        self.bpjs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(summary.key.clone(), summary);
    }

    fn load_tax_year(&self, key: &TaxYearKey) -> Option<EmployeeTaxYearSummary> {
        self.tax_years
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save_tax_year(&self, summary: EmployeeTaxYearSummary) {
        self.tax_years
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(summary.key.clone(), summary);
    }

    fn load_flat_rate(&self, key: &PeriodKey) -> Option<FlatRateCompanyPeriod> {
        self.flat_rates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save_flat_rate(&self, summary: FlatRateCompanyPeriod) {
        self.flat_rates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(summary.key.clone(), summary);
    }
}
