//! Calculation logic for the payroll deduction engine.
//!
//! This module contains the BPJS contribution calculator, position cost,
//! progressive bracket tax, flat effective rate lookup, the PPh 21
//! calculator with its method policy, and the per-employee pipeline that
//! ties them together.

mod contribution;
mod flat_rate;
mod pipeline;
mod position_cost;
mod progressive;
mod tax;

pub use contribution::calculate_contributions;
pub use flat_rate::{FlatRateLookup, resolve_flat_rate};
pub use pipeline::{calculate_payroll, calculate_payroll_with};
pub use position_cost::calculate_position_cost;
pub use progressive::{ProgressiveTax, calculate_progressive_tax};
pub use tax::{MethodSelection, TaxInput, TaxMethodPolicy, calculate_tax};
