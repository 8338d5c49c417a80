//! Integration tests for the payroll deduction engine.
//!
//! This test suite drives the HTTP API and the aggregation layer with the
//! shipped `config/id2024` rate set:
//! - Flat effective rate months
//! - Progressive months and the year-end correction
//! - BPJS salary caps and enrollment combinations
//! - Exemptions and data warnings
//! - Journals and account overrides
//! - A full payroll month aggregated across employees
//! - Error cases

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;
use tower::ServiceExt;

use pph21_engine::accounts::{AccountResolver, build_journal};
use pph21_engine::aggregation::{ComponentReconciler, PeriodAggregator, SummaryStore};
use pph21_engine::api::{AppState, create_router};
use pph21_engine::config::ConfigLoader;
use pph21_engine::error::EngineError;
use pph21_engine::models::{
    BpjsEnrollment, Period, PeriodInput, PeriodKey, TaxProfile, TaxStatus, TaxYearKey,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn load_config() -> ConfigLoader {
    ConfigLoader::load("./config/id2024").expect("Failed to load config")
}

fn create_router_for_test() -> Router {
    create_router(AppState::new(load_config()).expect("Failed to build state"))
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Reads a decimal serialized as a JSON string.
fn dec_at(value: &Value) -> Decimal {
    decimal(value.as_str().unwrap_or_else(|| panic!("expected decimal string, got {}", value)))
}

async fn post_calculate(router: Router, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/calculate")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

fn create_request(status: &str, month: u32, gross: &str, base: Option<&str>) -> Value {
    json!({
        "employee": {
            "id": "EMP-001",
            "name": "Siti Rahma",
            "tax_status": status,
            "has_npwp": true,
            "has_nik": true,
            "bpjs_kesehatan": true,
            "bpjs_ketenagakerjaan": true
        },
        "period": {
            "company": "PT Maju Bersama",
            "year": 2025,
            "month": month,
            "gross_pay": gross,
            "base_salary": base,
            "slip_id": format!("SLIP-2025-{:02}-001", month)
        }
    })
}

fn not_enrolled(mut request: Value) -> Value {
    request["employee"]["bpjs_kesehatan"] = json!(false);
    request["employee"]["bpjs_ketenagakerjaan"] = json!(false);
    request
}

fn force_progressive(mut request: Value) -> Value {
    request["method"] = json!({ "use_flat_rate": false, "year_end_correction": false });
    request
}

fn warning_codes(result: &Value) -> Vec<String> {
    result["outcome"]["audit_trace"]["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["code"].as_str().unwrap().to_string())
        .collect()
}

fn period_input(employee_id: &str, month: u32, gross: &str) -> PeriodInput {
    PeriodInput {
        employee_id: employee_id.to_string(),
        company: "PT Maju Bersama".to_string(),
        period: Period::new(2025, month),
        gross_pay: decimal(gross),
        start_date: NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, month, 28).unwrap(),
        base_salary: Some(decimal(gross)),
        slip_id: format!("SLIP-{}-2025-{:02}", employee_id, month),
    }
}

// =============================================================================
// SECTION 1: Flat Effective Rate Months
// =============================================================================

#[tokio::test]
async fn test_flat_rate_tk0_ten_million() {
    let router = create_router_for_test();
    let request = create_request("TK0", 3, "10000000", Some("10000000"));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let tax = &result["outcome"]["tax"];
    assert_eq!(tax["method"], "flat_rate");
    assert_eq!(tax["flat_rate"]["category"], "A");
    assert_eq!(dec_at(&tax["flat_rate"]["rate"]), decimal("2"));
    assert_eq!(dec_at(&tax["tax_amount"]), decimal("200000"));

    let totals = &result["outcome"]["totals"];
    assert_eq!(dec_at(&totals["bpjs_employee"]), decimal("390776"));
    assert_eq!(dec_at(&totals["bpjs_employer"]), decimal("1005552"));
    assert_eq!(dec_at(&totals["take_home_pay"]), decimal("9409224"));
}

#[tokio::test]
async fn test_flat_rate_category_b_for_k1() {
    let router = create_router_for_test();
    let request = not_enrolled(create_request("K1", 5, "10000000", Some("10000000")));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["outcome"]["tax"]["flat_rate"]["category"], "B");
    // flat rate ignores PTKP and BPJS: tax = gross x rate
    let rate = dec_at(&result["outcome"]["tax"]["flat_rate"]["rate"]);
    let tax = dec_at(&result["outcome"]["tax"]["tax_amount"]);
    assert_eq!(tax, (decimal("10000000") * rate / Decimal::ONE_HUNDRED).floor());
}

#[tokio::test]
async fn test_flat_rate_below_first_threshold_is_zero() {
    let router = create_router_for_test();
    let request = create_request("TK0", 2, "5400000", Some("5400000"));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec_at(&result["outcome"]["tax"]["tax_amount"]), Decimal::ZERO);
}

// =============================================================================
// SECTION 2: Progressive Brackets
// =============================================================================

#[tokio::test]
async fn test_progressive_k1_ten_million() {
    let router = create_router_for_test();
    let request = force_progressive(not_enrolled(create_request(
        "K1",
        3,
        "10000000",
        Some("10000000"),
    )));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let tax = &result["outcome"]["tax"];
    assert_eq!(tax["method"], "progressive");
    assert_eq!(dec_at(&tax["position_cost"]), decimal("500000"));
    assert_eq!(dec_at(&tax["ptkp"]), decimal("63000000"));
    assert_eq!(dec_at(&tax["taxable_base"]), decimal("51000000"));
    assert_eq!(dec_at(&tax["tax_amount"]), decimal("212500"));
    assert_eq!(tax["brackets"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_progressive_subtracts_employee_bpjs() {
    let router = create_router_for_test();
    let request = force_progressive(create_request("TK0", 3, "10000000", Some("10000000")));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let tax = &result["outcome"]["tax"];
    // 10,000,000 - 500,000 position cost - 390,776 BPJS
    assert_eq!(dec_at(&tax["net_income"]), decimal("9109224"));
    // 109,310,688 - 54,000,000 = 55,310,688 at 5% = 2,765,534.4 floored per bracket
    assert_eq!(dec_at(&tax["taxable_base"]), decimal("55310688"));
    assert_eq!(dec_at(&tax["annual_tax"]), decimal("2765534"));
    assert_eq!(dec_at(&tax["tax_amount"]), decimal("230461"));
}

#[tokio::test]
async fn test_progressive_crosses_into_second_bracket() {
    let router = create_router_for_test();
    let request = force_progressive(not_enrolled(create_request(
        "TK0",
        4,
        "20000000",
        Some("20000000"),
    )));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let tax = &result["outcome"]["tax"];
    // annual net 240,000,000 - 6,000,000 = 234,000,000; base 180,000,000
    // 60M x 5% + 120M x 15% = 21,000,000 a year
    assert_eq!(dec_at(&tax["taxable_base"]), decimal("180000000"));
    assert_eq!(dec_at(&tax["annual_tax"]), decimal("21000000"));
    assert_eq!(dec_at(&tax["tax_amount"]), decimal("1750000"));
    assert_eq!(tax["brackets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_income_below_ptkp_owes_nothing() {
    let router = create_router_for_test();
    let request = force_progressive(not_enrolled(create_request(
        "K3",
        4,
        "6000000",
        Some("6000000"),
    )));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec_at(&result["outcome"]["tax"]["taxable_base"]), Decimal::ZERO);
    assert_eq!(dec_at(&result["outcome"]["tax"]["tax_amount"]), Decimal::ZERO);
}

// =============================================================================
// SECTION 3: Year-End Correction
// =============================================================================

#[tokio::test]
async fn test_december_correction_from_supplied_ytd() {
    let router = create_router_for_test();
    let mut request = not_enrolled(create_request("TK0", 12, "10000000", Some("10000000")));
    request["ytd"] = json!({
        "gross": "110000000",
        "bpjs_employee": "0",
        "tax_paid": "2200000",
        "months": 11
    });

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let tax = &result["outcome"]["tax"];
    assert_eq!(tax["method"], "progressive");
    assert_eq!(dec_at(&tax["correction"]["annual_tax"]), decimal("3000000"));
    assert_eq!(dec_at(&tax["tax_amount"]), decimal("800000"));
}

#[tokio::test]
async fn test_december_overpayment_is_refunded() {
    let router = create_router_for_test();
    let mut request = not_enrolled(create_request("TK0", 12, "10000000", Some("10000000")));
    request["ytd"] = json!({
        "gross": "110000000",
        "tax_paid": "4000000",
        "months": 11
    });

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let totals = &result["outcome"]["totals"];
    assert_eq!(dec_at(&totals["pph21"]), decimal("-1000000"));
    assert_eq!(dec_at(&totals["take_home_pay"]), decimal("11000000"));
}

// =============================================================================
// SECTION 4: BPJS Contributions
// =============================================================================

#[tokio::test]
async fn test_bpjs_caps_apply_to_kesehatan_and_jp() {
    let router = create_router_for_test();
    let request = create_request("TK0", 3, "20000000", Some("20000000"));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let bpjs = &result["outcome"]["contributions"];
    assert_eq!(dec_at(&bpjs["kesehatan"]["salary_base"]), decimal("12000000"));
    assert_eq!(dec_at(&bpjs["kesehatan"]["employee_amount"]), decimal("120000"));
    assert_eq!(dec_at(&bpjs["kesehatan"]["employer_amount"]), decimal("480000"));
    assert_eq!(dec_at(&bpjs["jp"]["salary_base"]), decimal("9077600"));
    assert_eq!(dec_at(&bpjs["jp"]["employee_amount"]), decimal("90776"));
    // JHT has no cap
    assert_eq!(dec_at(&bpjs["jht"]["employee_amount"]), decimal("400000"));
    assert_eq!(dec_at(&bpjs["jht"]["employer_amount"]), decimal("740000"));
    assert_eq!(dec_at(&bpjs["jkk"]["employer_amount"]), decimal("48000"));
    assert_eq!(dec_at(&bpjs["jkm"]["employer_amount"]), decimal("60000"));
    assert_eq!(dec_at(&bpjs["jkk"]["employee_amount"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_kesehatan_only_enrollment() {
    let router = create_router_for_test();
    let mut request = create_request("TK0", 3, "10000000", Some("10000000"));
    request["employee"]["bpjs_ketenagakerjaan"] = json!(false);

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let bpjs = &result["outcome"]["contributions"];
    assert_eq!(bpjs["kesehatan"]["applicable"], true);
    assert_eq!(bpjs["jht"]["applicable"], false);
    assert_eq!(dec_at(&bpjs["total_employee"]), decimal("100000"));
    assert_eq!(dec_at(&bpjs["total_employer"]), decimal("400000"));
    // kesehatan employee + employer, then pph21
    assert_eq!(result["line_items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_base_salary_falls_back_to_minimum_wage() {
    let router = create_router_for_test();
    let request = create_request("TK0", 3, "6000000", None);

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec_at(&result["outcome"]["base_salary"]), decimal("5396761"));
    assert!(warning_codes(&result).contains(&"zero_base_salary".to_string()));
}

// =============================================================================
// SECTION 5: Exemptions & Data Warnings
// =============================================================================

#[tokio::test]
async fn test_final_tax_employee_withholds_nothing() {
    let router = create_router_for_test();
    let mut request = create_request("TK0", 3, "50000000", Some("20000000"));
    request["employee"]["final_tax"] = json!(true);

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["outcome"]["tax"]["exemption"], "final_tax");
    assert_eq!(dec_at(&result["outcome"]["tax"]["tax_amount"]), Decimal::ZERO);
    // BPJS still applies
    assert!(dec_at(&result["outcome"]["totals"]["bpjs_employee"]) > Decimal::ZERO);
}

#[tokio::test]
async fn test_zero_gross_withholds_nothing() {
    let router = create_router_for_test();
    let request = create_request("TK0", 3, "0", None);

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["outcome"]["tax"]["exemption"], "zero_gross");
    assert_eq!(dec_at(&result["outcome"]["tax"]["tax_amount"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_missing_profile_fields_raise_warnings() {
    let router = create_router_for_test();
    let body = json!({
        "employee": { "id": "EMP-009" },
        "period": {
            "company": "PT Maju Bersama",
            "year": 2025,
            "month": 3,
            "gross_pay": "10000000",
            "base_salary": "10000000",
            "slip_id": "SLIP-009"
        }
    });

    let (status, result) = post_calculate(router, body).await;

    assert_eq!(status, StatusCode::OK);
    let codes = warning_codes(&result);
    assert!(codes.contains(&"missing_tax_status".to_string()));
    assert!(codes.contains(&"missing_bpjs_enrollment".to_string()));
    assert_eq!(result["outcome"]["status"], "TK0");
    assert_eq!(dec_at(&result["outcome"]["totals"]["bpjs_employee"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_dependents_mismatch_is_corrected() {
    let router = create_router_for_test();
    let mut request = create_request("K2", 3, "10000000", Some("10000000"));
    request["employee"]["dependents"] = json!(0);

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(warning_codes(&result).contains(&"dependents_mismatch".to_string()));
    assert_eq!(result["outcome"]["status"], "K2");
}

// =============================================================================
// SECTION 6: Journals
// =============================================================================

#[tokio::test]
async fn test_journal_balances_and_uses_company_override() {
    let router = create_router_for_test();
    let mut request = create_request("TK0", 3, "10000000", Some("10000000"));
    request["period"]["company"] = json!("PT Sinar Abadi");
    request["include_journal"] = json!(true);

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let journal = &result["journal"];
    assert_eq!(dec_at(&journal["total_debit"]), dec_at(&journal["total_credit"]));

    let lines = journal["lines"].as_array().unwrap();
    let pph21 = lines.iter().find(|l| l["component"] == "pph21").unwrap();
    assert_eq!(pph21["account"], "Hutang PPh 21 Karyawan - PSA");
    let jht = lines
        .iter()
        .find(|l| l["component"] == "bpjs_jht_employee")
        .unwrap();
    assert_eq!(jht["account"], "BPJS JHT Payable - PSA");
}

#[test]
fn test_shipped_account_mappings_validate() {
    let config = load_config();
    assert!(AccountResolver::new(config.accounts()).is_ok());
}

// =============================================================================
// SECTION 7: Aggregating A Payroll Month
// =============================================================================

#[test]
fn test_payroll_month_aggregates_and_reconciles() {
    let config = load_config();
    let aggregator = PeriodAggregator::in_memory();
    let resolver = AccountResolver::new(config.accounts()).unwrap();
    let reconciler = ComponentReconciler::new();

    let staff = [
        ("EMP-001", TaxStatus::Tk0, "10000000"),
        ("EMP-002", TaxStatus::K1, "15000000"),
        ("EMP-003", TaxStatus::K3, "7500000"),
    ];
    let mut expected_tax = Decimal::ZERO;
    for (employee_id, status, gross) in staff {
        let profile = TaxProfile::new(employee_id, status);
        let (outcome, report) = aggregator
            .process(&profile, &period_input(employee_id, 3, gross), config.rates())
            .unwrap();
        assert!(report.warnings.is_empty());
        expected_tax += outcome.tax.tax_amount;

        let journal = build_journal(&outcome, &resolver).unwrap();
        assert!(journal.is_balanced());

        let mut slip_items = outcome.line_items();
        assert!(reconciler.reconcile_line_items(&outcome, &mut slip_items).is_empty());
    }

    let key = PeriodKey::new("PT Maju Bersama", Period::new(2025, 3));
    let expected: Vec<String> = staff.iter().map(|(id, _, _)| id.to_string()).collect();
    aggregator.mark_complete(&key, &expected).unwrap();

    let bpjs = aggregator.store().load_bpjs(&key).unwrap();
    assert!(bpjs.complete);
    assert_eq!(bpjs.rows.len(), 3);
    let row_sum: Decimal = bpjs.rows.iter().map(|r| r.total_employee()).sum();
    assert_eq!(bpjs.totals.total_employee, row_sum);

    let flat = aggregator.store().load_flat_rate(&key).unwrap();
    assert_eq!(flat.rows.len(), 3);
    assert_eq!(flat.total_tax, expected_tax);

    assert!(aggregator.finalize_period(&key));
    let late = aggregator.process(
        &TaxProfile::new("EMP-004", TaxStatus::Tk0),
        &period_input("EMP-004", 3, "5000000"),
        config.rates(),
    );
    assert!(matches!(late, Err(EngineError::SummaryFinalized { .. })));
}

#[test]
fn test_cancelled_slip_leaves_ytd_without_that_month() {
    let config = load_config();
    let aggregator = PeriodAggregator::in_memory();
    let profile = TaxProfile {
        enrollment: Some(BpjsEnrollment::none()),
        ..TaxProfile::new("EMP-001", TaxStatus::Tk0)
    };

    for month in 1..=3 {
        aggregator
            .process(&profile, &period_input("EMP-001", month, "10000000"), config.rates())
            .unwrap();
    }
    aggregator
        .cancel_slip(&period_input("EMP-001", 2, "10000000"))
        .unwrap();

    let ytd = aggregator.ytd_context("EMP-001", Period::new(2025, 4));
    assert_eq!(ytd.months, 2);
    assert_eq!(ytd.gross, decimal("20000000"));

    let year = aggregator
        .store()
        .load_tax_year(&TaxYearKey::new("EMP-001", 2025))
        .unwrap();
    let months: Vec<u32> = year.rows.iter().map(|r| r.month).collect();
    assert_eq!(months, vec![1, 3]);
}

// =============================================================================
// SECTION 8: Error Cases
// =============================================================================

#[tokio::test]
async fn test_error_invalid_month() {
    let router = create_router_for_test();
    let request = create_request("TK0", 13, "10000000", None);

    let (status, error) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_PERIOD");
}

#[tokio::test]
async fn test_error_end_before_start() {
    let router = create_router_for_test();
    let mut request = create_request("TK0", 3, "10000000", None);
    request["period"]["start_date"] = json!("2025-03-20");
    request["period"]["end_date"] = json!("2025-03-10");

    let (status, error) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_PERIOD");
}

#[tokio::test]
async fn test_error_negative_gross() {
    let router = create_router_for_test();
    let request = create_request("TK0", 3, "-1", None);

    let (status, error) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_PERIOD");
}

#[tokio::test]
async fn test_error_missing_period() {
    let router = create_router_for_test();
    let body = json!({ "employee": { "id": "EMP-001", "tax_status": "TK0" } });

    let (status, error) = post_calculate(router, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["message"].as_str().unwrap().contains("missing field"));
}

#[tokio::test]
async fn test_error_unknown_tax_status() {
    let router = create_router_for_test();
    let request = create_request("K9", 3, "10000000", None);

    let (status, error) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_PROFILE");
}

// =============================================================================
// SECTION 9: Audit Trace & Response Fields
// =============================================================================

#[tokio::test]
async fn test_audit_steps_are_numbered_across_calculators() {
    let router = create_router_for_test();
    let request = create_request("TK0", 3, "10000000", Some("10000000"));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let outcome = &result["outcome"];
    let mut numbers: Vec<u64> = Vec::new();
    for steps in [
        &outcome["audit_trace"]["steps"],
        &outcome["contributions"]["audit_steps"],
        &outcome["tax"]["audit_steps"],
    ] {
        for step in steps.as_array().unwrap() {
            assert!(step["rule_id"].is_string());
            assert!(step["reasoning"].is_string());
            numbers.push(step["step_number"].as_u64().unwrap());
        }
    }
    let expected: Vec<u64> = (1..=numbers.len() as u64).collect();
    assert_eq!(numbers, expected);
}

#[tokio::test]
async fn test_response_carries_identity_fields() {
    let router = create_router_for_test();
    let request = create_request("TK0", 3, "10000000", Some("10000000"));

    let (status, result) = post_calculate(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let outcome = &result["outcome"];
    assert!(outcome["calculation_id"].is_string());
    assert!(outcome["timestamp"].is_string());
    assert_eq!(outcome["engine_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(outcome["employee_name"], "Siti Rahma");
    assert_eq!(outcome["slip_id"], "SLIP-2025-03-001");
    assert_eq!(outcome["period"]["month"], 3);
}
