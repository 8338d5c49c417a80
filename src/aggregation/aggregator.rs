//! Folding per-employee outcomes into period summaries.
//!
//! Every summary follows the same lifecycle: absent until the first
//! outcome touches it, a draft while rows are upserted, and finalized once
//! the caller closes it. Upserts replace the row keyed by employee (or by
//! month for the tax year), so recording the same outcome twice leaves the
//! store exactly as recording it once.

use serde::{Deserialize, Serialize};

use crate::calculation::calculate_payroll;
use crate::config::RateConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    BpjsEmployeeRow, BpjsPeriodSummary, DataWarning, EmployeeTaxYearSummary, FlatRateCompanyPeriod,
    FlatRateRow, MonthlyTaxRow, PayrollOutcome, Period, PeriodInput, PeriodKey, RowChange,
    Summary, TaxProfile, TaxYearKey, YtdContext,
};

use super::reconciler::ComponentReconciler;
use super::store::{InMemorySummaryStore, SummaryStore};

/// What [`PeriodAggregator::record`] changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// Change to the company-period BPJS summary.
    pub bpjs: RowChange,
    /// Change to the employee tax-year summary.
    pub tax_year: RowChange,
    /// Change to the flat-rate table; `None` for a non flat-rate outcome.
    pub flat_rate: Option<RowChange>,
    /// Set when a stale flat-rate row was removed because the employee is
    /// now taxed progressively.
    pub removed_from_flat_rate: bool,
    /// Corrections made by reconciling the stored summaries before the write.
    pub warnings: Vec<DataWarning>,
}

/// What [`PeriodAggregator::cancel_slip`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReport {
    /// Rows removed across all summaries.
    pub removed: usize,
    /// Corrections made while reconciling the summaries before removal.
    pub warnings: Vec<DataWarning>,
}

/// Maintains BPJS, tax-year and flat-rate summaries through a [`SummaryStore`].
///
/// # Example
///
/// ```no_run
/// use pph21_engine::aggregation::PeriodAggregator;
/// use pph21_engine::config::ConfigLoader;
/// use pph21_engine::models::{Period, PeriodInput, TaxProfile, TaxStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let loader = ConfigLoader::load("./config/id2024").unwrap();
/// let aggregator = PeriodAggregator::in_memory();
/// let profile = TaxProfile::new("EMP-001", TaxStatus::K1);
/// let input = PeriodInput {
///     employee_id: "EMP-001".to_string(),
///     company: "PT Maju Bersama".to_string(),
///     period: Period::new(2025, 1),
///     gross_pay: Decimal::new(10_000_000, 0),
///     start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
///     base_salary: None,
///     slip_id: "SLIP-2025-01-001".to_string(),
/// };
///
/// let (outcome, report) = aggregator.process(&profile, &input, loader.rates()).unwrap();
/// println!("{} withheld, BPJS row {:?}", outcome.totals.pph21, report.bpjs);
/// ```
pub struct PeriodAggregator<S: SummaryStore = InMemorySummaryStore> {
    store: S,
    reconciler: ComponentReconciler,
}

impl PeriodAggregator<InMemorySummaryStore> {
    /// An aggregator over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(InMemorySummaryStore::new())
    }
}

impl<S: SummaryStore> PeriodAggregator<S> {
    /// Creates an aggregator over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            reconciler: ComponentReconciler::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Year-to-date totals of the employee's months before `period`.
    pub fn ytd_context(&self, employee_id: &str, period: Period) -> YtdContext {
        self.store
            .load_tax_year(&TaxYearKey::new(employee_id, period.year))
            .map(|summary| summary.ytd_before(period.month))
            .unwrap_or_default()
    }

    /// Calculates one employee's period using the stored year-to-date
    /// history, then records the outcome.
    ///
    /// # Arguments
    ///
    /// * `profile` - The employee's tax profile
    /// * `input` - Gross pay and period data
    /// * `rates` - The rate snapshot
    ///
    /// # Returns
    ///
    /// The outcome and what changed in the store.
    pub fn process(
        &self,
        profile: &TaxProfile,
        input: &PeriodInput,
        rates: &RateConfig,
    ) -> EngineResult<(PayrollOutcome, AggregationReport)> {
        let ytd = self.ytd_context(&input.employee_id, input.period);
        let outcome = calculate_payroll(profile, input, ytd, rates)?;
        let report = self.record(&outcome, profile)?;
        Ok((outcome, report))
    }

    /// Upserts the outcome into every summary it belongs to.
    ///
    /// The BPJS row is written even when the employee is enrolled in no
    /// program, so the company-period shows a zero row rather than a gap.
    /// A flat-rate outcome is upserted into the flat-rate table; any other
    /// outcome removes a stale row for the employee from that table.
    ///
    /// # Returns
    ///
    /// The changes made, or [`EngineError::SummaryFinalized`] when any of
    /// the summaries to be written is finalized. Nothing is written in
    /// that case.
    pub fn record(
        &self,
        outcome: &PayrollOutcome,
        profile: &TaxProfile,
    ) -> EngineResult<AggregationReport> {
        let period_key = PeriodKey::new(&outcome.company, outcome.period);
        let year_key = TaxYearKey::new(&outcome.employee_id, outcome.period.year);

        let mut bpjs = self
            .store
            .load_bpjs(&period_key)
            .unwrap_or_else(|| BpjsPeriodSummary::new(period_key.clone()));
        let mut tax_year = self
            .store
            .load_tax_year(&year_key)
            .unwrap_or_else(|| EmployeeTaxYearSummary::new(year_key.clone()));
        let flat_row = flat_rate_row(outcome, profile);
        let existing_flat = self.store.load_flat_rate(&period_key);
        let flat_rate = match (existing_flat, &flat_row) {
            (Some(table), _) => Some(table),
            (None, Some(_)) => Some(FlatRateCompanyPeriod::new(period_key.clone())),
            (None, None) => None,
        };

        bpjs.ensure_draft()?;
        tax_year.ensure_draft()?;
        let flat_touched = flat_rate.as_ref().is_some_and(|table| {
            flat_row.is_some() || table.row(&outcome.employee_id).is_some()
        });
        if let Some(table) = flat_rate.as_ref().filter(|_| flat_touched) {
            table.ensure_draft()?;
        }

        // Stored state is checked before it is mutated; upserts recompute totals.
        let mut warnings = self.reconciler.reconcile_totals(&mut bpjs);
        warnings.extend(self.reconciler.reconcile_totals(&mut tax_year));

        let bpjs_change = bpjs.upsert_row(BpjsEmployeeRow::from_contribution(
            &outcome.employee_id,
            outcome.employee_name.clone(),
            &outcome.contributions,
            &outcome.slip_id,
        ));

        if outcome.employee_name.is_some() {
            tax_year.employee_name = outcome.employee_name.clone();
        }
        let tax_change = tax_year.upsert_row(MonthlyTaxRow::from_tax(
            outcome.period.month,
            &outcome.tax,
            &outcome.slip_id,
        ));

        let mut flat_change = None;
        let mut removed_from_flat_rate = false;
        if let Some(mut table) = flat_rate.filter(|_| flat_touched) {
            warnings.extend(self.reconciler.reconcile_totals(&mut table));
            match flat_row {
                Some(row) => flat_change = Some(table.upsert_row(row)),
                None => removed_from_flat_rate = table.remove_employee(&outcome.employee_id),
            }
            self.store.save_flat_rate(table);
        }

        self.store.save_bpjs(bpjs);
        self.store.save_tax_year(tax_year);

        tracing::info!(
            employee_id = %outcome.employee_id,
            company = %outcome.company,
            period = %outcome.period,
            slip_id = %outcome.slip_id,
            bpjs = ?bpjs_change,
            tax_year = ?tax_change,
            flat_rate = ?flat_change,
            "Outcome aggregated"
        );

        Ok(AggregationReport {
            bpjs: bpjs_change,
            tax_year: tax_change,
            flat_rate: flat_change,
            removed_from_flat_rate,
            warnings,
        })
    }

    /// Removes every row sourced from the input's slip and recomputes totals.
    ///
    /// Each summary holding the slip is reconciled before the removal, so
    /// drift already in the store is corrected and reported.
    ///
    /// # Returns
    ///
    /// The number of rows removed across all summaries with any
    /// reconciliation warnings, or [`EngineError::SummaryFinalized`] when a
    /// summary holding one of those rows is finalized. Nothing is removed in
    /// that case.
    pub fn cancel_slip(&self, input: &PeriodInput) -> EngineResult<CancellationReport> {
        let period_key = PeriodKey::new(&input.company, input.period);
        let year_key = TaxYearKey::new(&input.employee_id, input.period.year);
        let slip_id = input.slip_id.as_str();

        let bpjs = holding_slip(self.store.load_bpjs(&period_key), slip_id)?;
        let tax_year = holding_slip(self.store.load_tax_year(&year_key), slip_id)?;
        let flat_rate = holding_slip(self.store.load_flat_rate(&period_key), slip_id)?;

        let mut report = CancellationReport::default();
        if let Some(mut summary) = bpjs {
            report.warnings.extend(self.reconciler.reconcile_totals(&mut summary));
            report.removed += summary.remove_slip(slip_id);
            self.store.save_bpjs(summary);
        }
        if let Some(mut summary) = tax_year {
            report.warnings.extend(self.reconciler.reconcile_totals(&mut summary));
            report.removed += summary.remove_slip(slip_id);
            self.store.save_tax_year(summary);
        }
        if let Some(mut summary) = flat_rate {
            report.warnings.extend(self.reconciler.reconcile_totals(&mut summary));
            report.removed += summary.remove_slip(slip_id);
            self.store.save_flat_rate(summary);
        }

        tracing::info!(
            slip_id,
            removed = report.removed,
            warnings = report.warnings.len(),
            "Slip cancelled"
        );
        Ok(report)
    }

    /// Marks the company-period BPJS summary complete.
    ///
    /// # Returns
    ///
    /// [`EngineError::SummaryIncomplete`] listing the expected employees
    /// without a row (all of them when no summary exists yet), or
    /// [`EngineError::SummaryFinalized`] when the summary is finalized.
    pub fn mark_complete(&self, key: &PeriodKey, expected_employees: &[String]) -> EngineResult<()> {
        let Some(mut summary) = self.store.load_bpjs(key) else {
            return Err(EngineError::SummaryIncomplete {
                summary: BpjsPeriodSummary::new(key.clone()).summary_key(),
                missing: expected_employees.to_vec(),
            });
        };
        summary.ensure_draft()?;

        let missing: Vec<String> = expected_employees
            .iter()
            .filter(|employee_id| summary.row(employee_id).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::SummaryIncomplete {
                summary: summary.summary_key(),
                missing,
            });
        }

        summary.complete = true;
        self.store.save_bpjs(summary);
        tracing::info!(summary = %key, employees = expected_employees.len(), "Summary complete");
        Ok(())
    }

    /// Finalizes the company-period BPJS summary and flat-rate table.
    ///
    /// Returns false when neither exists. Finalizing twice is a no-op.
    pub fn finalize_period(&self, key: &PeriodKey) -> bool {
        let mut found = false;
        if let Some(mut summary) = self.store.load_bpjs(key) {
            summary.finalize();
            self.store.save_bpjs(summary);
            found = true;
        }
        if let Some(mut summary) = self.store.load_flat_rate(key) {
            summary.finalize();
            self.store.save_flat_rate(summary);
            found = true;
        }
        if found {
            tracing::info!(summary = %key, "Period finalized");
        }
        found
    }

    /// Finalizes an employee's tax-year summary. Returns false when absent.
    pub fn finalize_tax_year(&self, key: &TaxYearKey) -> bool {
        match self.store.load_tax_year(key) {
            Some(mut summary) => {
                summary.finalize();
                self.store.save_tax_year(summary);
                tracing::info!(summary = %key, "Tax year finalized");
                true
            }
            None => false,
        }
    }
}

fn flat_rate_row(outcome: &PayrollOutcome, profile: &TaxProfile) -> Option<FlatRateRow> {
    let matched = outcome.tax.flat_rate.as_ref()?;
    Some(FlatRateRow {
        employee_id: outcome.employee_id.clone(),
        employee_name: outcome.employee_name.clone(),
        status: outcome.status,
        has_npwp: profile.has_npwp,
        has_nik: profile.has_nik,
        gross_pay: outcome.tax.gross_pay,
        position_cost: outcome.tax.position_cost,
        net_income: outcome.tax.net_income,
        rate: matched.rate,
        tax_amount: outcome.tax.tax_amount,
        slip_id: outcome.slip_id.clone(),
    })
}

/// Keeps the summary only when it holds a row from `slip_id`, failing if it
/// is finalized.
fn holding_slip<T: Summary>(summary: Option<T>, slip_id: &str) -> EngineResult<Option<T>> {
    match summary {
        Some(summary) if summary.contains_slip(slip_id) => {
            summary.ensure_draft()?;
            Ok(Some(summary))
        }
        _ => Ok(None),
    }
}
