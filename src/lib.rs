//! Payroll deduction engine for Indonesian statutory payroll.
//!
//! This crate computes BPJS social insurance contributions and PPh 21
//! withholding tax for one employee and month, folds the results into
//! company-period and employee-year summaries, and resolves the ledger
//! accounts the amounts post to.
//!
//! Rates, PTKP amounts, tax brackets and flat effective rate tables are
//! loaded from YAML by [`config::ConfigLoader`]; nothing statutory is
//! hard-coded.

#![warn(missing_docs)]

pub mod accounts;
pub mod aggregation;
pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
