//! HTTP request handlers for the payroll deduction API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::build_journal;
use crate::calculation::{calculate_payroll, calculate_payroll_with};
use crate::error::EngineResult;

use super::request::CalculationRequest;
use super::response::{ApiError, ApiErrorResponse, CalculationResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .with_state(state)
}

/// Handler for POST /calculate endpoint.
///
/// Accepts a calculation request and returns contributions, tax and
/// optionally the ledger journal.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            return (
                StatusCode::BAD_REQUEST,
                [(header::CONTENT_TYPE, "application/json")],
                Json(error),
            )
                .into_response();
        }
    };

    let start_time = Instant::now();
    match perform_calculation(request, &state) {
        Ok(response) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %response.outcome.employee_id,
                period = %response.outcome.period,
                method = ?response.outcome.tax.method,
                pph21 = %response.outcome.totals.pph21,
                warnings = response.outcome.audit_trace.warnings.len(),
                duration_us = start_time.elapsed().as_micros(),
                "Calculation completed successfully"
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                Json(response),
            )
                .into_response()
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Calculation failed"
            );
            let api_error: ApiErrorResponse = err.into();
            (
                api_error.status,
                [(header::CONTENT_TYPE, "application/json")],
                Json(api_error.error),
            )
                .into_response()
        }
    }
}

/// Runs the pipeline for one request.
fn perform_calculation(
    request: CalculationRequest,
    state: &AppState,
) -> EngineResult<CalculationResponse> {
    let profile = request.employee.into_profile()?;
    let input = request.period.into_input(&profile.employee_id)?;
    let rates = state.config().rates();

    let outcome = match request.method {
        Some(selection) => calculate_payroll_with(&profile, &input, request.ytd, selection, rates)?,
        None => calculate_payroll(&profile, &input, request.ytd, rates)?,
    };

    let journal = if request.include_journal {
        Some(build_journal(&outcome, state.accounts())?)
    } else {
        None
    };

    Ok(CalculationResponse {
        line_items: outcome.line_items(),
        outcome,
        journal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::request::{EmployeeRequest, PeriodRequest};
    use crate::calculation::MethodSelection;
    use crate::config::ConfigLoader;
    use crate::models::{TaxMethod, YtdContext};
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tower::ServiceExt;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/id2024").expect("Failed to load config");
        AppState::new(config).expect("Failed to build state")
    }

    fn create_valid_request() -> CalculationRequest {
        CalculationRequest {
            employee: EmployeeRequest {
                id: "EMP-001".to_string(),
                name: Some("Siti Rahma".to_string()),
                tax_status: Some("TK0".to_string()),
                dependents: Some(0),
                has_npwp: true,
                has_nik: true,
                final_tax: false,
                enrollment: None,
                bpjs_kesehatan: Some(true),
                bpjs_ketenagakerjaan: Some(true),
            },
            period: PeriodRequest {
                company: "PT Maju Bersama".to_string(),
                year: 2025,
                month: 3,
                gross_pay: dec("10000000"),
                base_salary: Some(dec("10000000")),
                start_date: None,
                end_date: None,
                slip_id: "SLIP-2025-03-001".to_string(),
            },
            ytd: YtdContext::default(),
            method: None,
            include_journal: false,
        }
    }

    async fn post_calculate(router: Router, body: String) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calculate")
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_valid_request_returns_200() {
        let router = create_router(create_test_state());
        let body = serde_json::to_string(&create_valid_request()).unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calculate")
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let result: CalculationResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(result.outcome.employee_id, "EMP-001");
        assert_eq!(result.outcome.tax.method, TaxMethod::FlatRate);
        assert_eq!(result.outcome.totals.pph21, dec("200000"));
        assert_eq!(result.line_items.len(), 9);
        assert!(result.journal.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let (status, body) = post_calculate(router, "{invalid json".to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_slip_id_returns_validation_error() {
        let router = create_router(create_test_state());
        let body = r#"{
            "employee": { "id": "EMP-001", "tax_status": "TK0" },
            "period": {
                "company": "PT Maju Bersama",
                "year": 2025,
                "month": 3,
                "gross_pay": "10000000"
            }
        }"#;

        let (status, body) = post_calculate(router, body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("slip_id"));
    }

    #[tokio::test]
    async fn test_unknown_status_returns_400() {
        let router = create_router(create_test_state());
        let mut request = create_valid_request();
        request.employee.tax_status = Some("Z1".to_string());

        let (status, body) =
            post_calculate(router, serde_json::to_string(&request).unwrap()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "INVALID_PROFILE");
    }

    #[tokio::test]
    async fn test_dates_outside_month_return_400() {
        let router = create_router(create_test_state());
        let mut request = create_valid_request();
        request.period.end_date = chrono::NaiveDate::from_ymd_opt(2025, 4, 2);

        let (status, body) =
            post_calculate(router, serde_json::to_string(&request).unwrap()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "INVALID_PERIOD");
    }

    #[tokio::test]
    async fn test_method_override_forces_progressive() {
        let router = create_router(create_test_state());
        let mut request = create_valid_request();
        request.method = Some(MethodSelection {
            use_flat_rate: false,
            year_end_correction: false,
        });

        let (status, body) =
            post_calculate(router, serde_json::to_string(&request).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        let result: CalculationResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.outcome.tax.method, TaxMethod::Progressive);
        assert!(!result.outcome.tax.brackets.is_empty());
    }

    #[tokio::test]
    async fn test_journal_is_included_on_request() {
        let router = create_router(create_test_state());
        let mut request = create_valid_request();
        request.include_journal = true;

        let (status, body) =
            post_calculate(router, serde_json::to_string(&request).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        let result: CalculationResponse = serde_json::from_slice(&body).unwrap();
        let journal = result.journal.unwrap();
        assert!(journal.is_balanced());
        assert_eq!(journal.slip_id, "SLIP-2025-03-001");
    }

    #[tokio::test]
    async fn test_journal_for_unmapped_company_returns_500() {
        let router = create_router(create_test_state());
        let mut request = create_valid_request();
        request.include_journal = true;
        request.period.company = "PT Tidak Terdaftar".to_string();

        let (status, body) =
            post_calculate(router, serde_json::to_string(&request).unwrap()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "ACCOUNT_ERROR");
    }
}
