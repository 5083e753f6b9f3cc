//! Behavior-driven tests for the DuckDB warehouse
//!
//! These tests use file-backed databases to verify what survives between
//! runs and how security records are merged.

use figilink_core::{
    ApiLogEntry, ResolvedSecurity, SecurityType, SecurityUpsert, SecurityUpsertExt, UpsertAction,
    Warehouse, WarehouseConfig,
};
use tempfile::tempdir;

const APPLE: &str = "US0378331005";

fn open(dir: &std::path::Path) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        figilink_home: dir.to_path_buf(),
        db_path: dir.join("figilink.duckdb"),
    })
    .expect("warehouse open")
}

fn attempt(retry_attempt: i32, response_code: i32, category: Option<&str>) -> ApiLogEntry {
    ApiLogEntry {
        isin: APPLE.to_string(),
        request_payload: r#"[{"idType":"ID_ISIN","idValue":"US0378331005"}]"#.to_string(),
        response_payload: Some(format!(r#"{{"response_code":{response_code}}}"#)),
        response_code,
        is_success: category.is_none(),
        error_message: category.map(|_| format!("HTTP error: status {response_code}")),
        error_category: category.map(str::to_string),
        processing_time_ms: Some(42),
        retry_attempt,
    }
}

fn apple() -> ResolvedSecurity {
    ResolvedSecurity {
        figi: Some("BBG000B9XRY4".to_string()),
        ticker: Some("AAPL".to_string()),
        bloomberg_code: Some("AAPL US Equity".to_string()),
        security_name: Some("APPLE INC".to_string()),
        security_type: SecurityType::Equity,
        exchange_code: Some("US".to_string()),
        currency: Some("USD".to_string()),
        data_quality_score: 1.0,
    }
}

// =============================================================================
// Warehouse: audit log
// =============================================================================

#[test]
fn audit_rows_survive_reopening_the_database() {
    // Given: A warehouse with two logged attempts
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = open(temp.path());
        warehouse
            .log_api_call(&attempt(1, 503, Some("Server Error")))
            .expect("log attempt 1");
        warehouse.log_api_call(&attempt(2, 200, None)).expect("log attempt 2");
    }

    // When: The database is reopened
    let warehouse = open(temp.path());
    let log = warehouse.recent_api_log(APPLE, 10).expect("read log");

    // Then: Both rows are present, newest first, with timestamps
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].retry_attempt, 2);
    assert!(log[0].is_success);
    assert_eq!(log[1].retry_attempt, 1);
    assert_eq!(log[1].error_category.as_deref(), Some("Server Error"));
    assert_eq!(log[1].processing_time_ms, Some(42));
    assert!(!log[1].response_timestamp.is_empty());
}

#[test]
fn recent_api_log_honours_limit_and_isin() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    for number in 1..=4 {
        warehouse
            .log_api_call(&attempt(number, 429, Some("Rate Limited")))
            .expect("log");
    }
    warehouse
        .log_api_call(&ApiLogEntry {
            isin: "DE000BASF111".to_string(),
            ..attempt(1, 200, None)
        })
        .expect("log other isin");

    let log = warehouse.recent_api_log(APPLE, 2).expect("read log");

    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|row| row.isin == APPLE));
    assert_eq!(log[0].retry_attempt, 4);
    assert_eq!(log[1].retry_attempt, 3);
}

// =============================================================================
// Warehouse: security upserts
// =============================================================================

#[test]
fn second_upsert_merges_into_existing_record() {
    // Given: A stored security
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    let first = warehouse
        .upsert_security(&SecurityUpsert::sanitized(APPLE, &apple(), 1))
        .expect("insert");
    assert_eq!(first, UpsertAction::Inserted);

    // When: A later lookup resolves fewer fields
    let sparse = ResolvedSecurity {
        figi: Some("BBG000B9XVV8".to_string()),
        ticker: None,
        bloomberg_code: None,
        security_name: None,
        security_type: SecurityType::Unknown,
        exchange_code: Some("not an exchange".to_string()),
        currency: None,
        data_quality_score: 0.3,
    };
    let second = warehouse
        .upsert_security(&SecurityUpsert::sanitized(APPLE, &sparse, 2))
        .expect("update");

    // Then: FIGI and Bloomberg code are replaced, absent fields are kept
    assert_eq!(second, UpsertAction::Updated);
    let stored = warehouse.get_security(APPLE).expect("read").expect("stored");
    assert_eq!(stored.figi.as_deref(), Some("BBG000B9XVV8"));
    assert_eq!(stored.bloomberg_code, None);
    assert_eq!(stored.ticker.as_deref(), Some("AAPL"));
    assert_eq!(stored.security_name, "APPLE INC");
    assert_eq!(stored.security_type, "EQUITY");
    assert_eq!(stored.exchange_code.as_deref(), Some("US"));
    assert_eq!(stored.currency.as_deref(), Some("USD"));
    assert_eq!(stored.data_quality_score, 0.3);
    assert_eq!(stored.processing_attempts, 2);
    assert_eq!(warehouse.count_securities(APPLE).expect("count"), 1);
}

#[test]
fn security_records_survive_reopening_the_database() {
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = open(temp.path());
        warehouse
            .upsert_security(&SecurityUpsert::sanitized(APPLE, &apple(), 1))
            .expect("insert");
    }

    let warehouse = open(temp.path());
    let stored = warehouse.get_security(APPLE).expect("read").expect("stored");

    assert_eq!(stored.bloomberg_code.as_deref(), Some("AAPL US Equity"));
    assert!(!stored.created_date.is_empty());
    assert!(stored.last_processing_attempt.is_some());
    assert_eq!(warehouse.db_path(), Some(temp.path().join("figilink.duckdb").as_path()));
}

#[test]
fn unknown_isin_has_no_security_record() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());

    assert_eq!(warehouse.get_security("GB0002634946").expect("read"), None);
    assert_eq!(warehouse.count_securities("GB0002634946").expect("count"), 0);
}
