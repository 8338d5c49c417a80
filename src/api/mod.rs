//! HTTP API module for the payroll deduction engine.
//!
//! This module exposes the per-employee pipeline as `POST /calculate`.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{CalculationRequest, EmployeeRequest, PeriodRequest};
pub use response::{ApiError, CalculationResponse};
pub use state::AppState;
