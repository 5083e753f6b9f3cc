//! ISIN lookup orchestration.
//!
//! One lookup validates the ISIN, calls OpenFIGI up to the configured
//! number of attempts, writes one audit row per attempt and, when FIGI
//! data was found, upserts the security record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use figilink_warehouse::{ApiLogEntry, SecurityUpsert, Warehouse, WarehouseConfig};
use serde::Serialize;
use serde_json::json;
use tracing::Instrument;

use crate::classify::{
    build_bloomberg_code, classify, data_quality_score, map_security_type, AttemptOutcome,
    ErrorCategory, QualityFields,
};
use crate::domain::SecurityType;
use crate::error::CoreError;
use crate::openfigi::{
    mapping_request_body, FigiInstrument, MappingResponse, OpenFigiClient, OpenFigiConfig,
};
use crate::persistence::{
    write_audit_log, write_security, LookupStore, ResolvedSecurity, SecurityUpsertExt,
};
use crate::retry::RetryPolicy;
use crate::validation::is_valid_isin;

/// Terminal state of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LookupStatus {
    Success,
    NoData,
    Error,
}

/// Summary of one lookup, returned to the caller and printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub isin: String,
    pub status: LookupStatus,
    pub figi: Option<String>,
    pub bloomberg_code: Option<String>,
    pub ticker: Option<String>,
    pub security_name: Option<String>,
    pub exchange_code: Option<String>,
    pub currency: Option<String>,
    pub security_type: Option<SecurityType>,
    pub data_quality_score: Option<f64>,
    /// Number of the last attempt made; `0` when the ISIN was rejected.
    pub attempts_used: u32,
    pub error_message: Option<String>,
    pub error_category: Option<ErrorCategory>,
    /// Status of the last attempt; `0` means no HTTP response.
    pub response_code: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl LookupResult {
    fn empty(isin: &str, status: LookupStatus) -> Self {
        Self {
            isin: isin.to_string(),
            status,
            figi: None,
            bloomberg_code: None,
            ticker: None,
            security_name: None,
            exchange_code: None,
            currency: None,
            security_type: None,
            data_quality_score: None,
            attempts_used: 0,
            error_message: None,
            error_category: None,
            response_code: None,
            warnings: Vec::new(),
        }
    }

    fn failed(isin: &str, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            error_category: Some(category),
            ..Self::empty(isin, LookupStatus::Error)
        }
    }

    fn with_resolved(mut self, resolved: ResolvedSecurity) -> Self {
        self.figi = resolved.figi;
        self.bloomberg_code = resolved.bloomberg_code;
        self.ticker = resolved.ticker;
        self.security_name = resolved.security_name;
        self.exchange_code = resolved.exchange_code;
        self.currency = resolved.currency;
        self.security_type = Some(resolved.security_type);
        self.data_quality_score = Some(resolved.data_quality_score);
        self
    }

    /// Result for a lookup that could not be run at all, for example
    /// because configuration or the warehouse failed before the first
    /// attempt.
    pub fn execution_error(isin: &str, message: impl Into<String>) -> Self {
        Self::failed(isin, ErrorCategory::ExecutionError, message)
    }

    pub fn is_success(&self) -> bool {
        self.status == LookupStatus::Success
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    /// Overrides the policy's attempt budget when set.
    pub max_attempts: Option<u32>,
    /// Number recorded for the first attempt in the audit log.
    pub start_attempt: u32,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            max_attempts: None,
            start_attempt: 1,
        }
    }
}

/// Resolves ISINs against OpenFIGI and records every attempt.
#[derive(Clone)]
pub struct IsinLookup {
    client: OpenFigiClient,
    store: Arc<dyn LookupStore>,
    retry: RetryPolicy,
}

impl IsinLookup {
    pub fn new(client: OpenFigiClient, store: Arc<dyn LookupStore>, retry: RetryPolicy) -> Self {
        Self {
            client,
            store,
            retry,
        }
    }

    /// Production wiring: reqwest transport and a file-backed warehouse.
    pub fn open(
        config: OpenFigiConfig,
        retry: RetryPolicy,
        warehouse: WarehouseConfig,
    ) -> Result<Self, CoreError> {
        let warehouse = Warehouse::open(warehouse)?;
        Ok(Self::new(
            OpenFigiClient::with_reqwest(config),
            Arc::new(warehouse),
            retry,
        ))
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn lookup(&self, isin: &str) -> LookupResult {
        self.lookup_with(isin, LookupOptions::default()).await
    }

    pub async fn lookup_with(&self, isin: &str, options: LookupOptions) -> LookupResult {
        if !is_valid_isin(isin) {
            tracing::warn!(isin, "rejecting malformed ISIN");
            return LookupResult::failed(
                isin,
                ErrorCategory::ValidationError,
                "Invalid ISIN format",
            );
        }

        let policy = match options.max_attempts {
            Some(max_attempts) => self.retry.with_max_attempts(max_attempts),
            None => self.retry,
        };
        let first_attempt = options.start_attempt.max(1);
        let request_payload = mapping_request_body(isin);

        let mut attempt = first_attempt;
        let mut attempts_made = 0;
        let (outcome, status) = loop {
            attempts_made += 1;
            let span = tracing::info_span!("openfigi_attempt", isin, attempt);
            let (response, elapsed) = self
                .timed_call(isin)
                .instrument(span.clone())
                .await;
            let outcome = classify(&response);

            span.in_scope(|| {
                tracing::info!(
                    status = response.status,
                    category = outcome.category().map(ErrorCategory::label),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "OpenFIGI attempt finished"
                );
            });

            // Audit logging is best effort; a lost row must not end the lookup.
            let _ = write_audit_log(
                self.store.as_ref(),
                &audit_entry(isin, &request_payload, &response, &outcome, elapsed, attempt),
            );

            if !policy.should_retry(&outcome, attempts_made) {
                break (outcome, response.status);
            }

            let delay = policy.delay_for_attempt(attempts_made);
            tracing::debug!(isin, attempt, delay_ms = delay.as_millis() as u64, "retrying");
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        };

        let mut result = match outcome {
            AttemptOutcome::DataFound(instrument) => {
                self.store_instrument(isin, &instrument, attempt)
            }
            AttemptOutcome::Warning(warning) => LookupResult {
                error_message: Some(warning),
                error_category: Some(ErrorCategory::NoData),
                ..LookupResult::empty(isin, LookupStatus::NoData)
            },
            AttemptOutcome::RecoverableError { category, message }
            | AttemptOutcome::FatalError { category, message } => {
                LookupResult::failed(isin, category, message)
            }
        };
        result.attempts_used = attempt;
        result.response_code = Some(status);
        result
    }

    async fn timed_call(&self, isin: &str) -> (MappingResponse, Duration) {
        let started = Instant::now();
        let response = self.client.map_isin(isin).await;
        (response, started.elapsed())
    }

    fn store_instrument(
        &self,
        isin: &str,
        instrument: &FigiInstrument,
        attempts_used: u32,
    ) -> LookupResult {
        let mut warnings = Vec::new();
        let security_type = match map_security_type(instrument.security_type.as_deref()) {
            Ok(security_type) => security_type,
            Err(unmapped) => {
                tracing::warn!(isin, %unmapped, "security type mapped to UNKNOWN");
                warnings.push(unmapped.to_string());
                SecurityType::Unknown
            }
        };

        let resolved = resolve(instrument, security_type);
        let upsert = SecurityUpsert::sanitized(isin, &resolved, attempts_used);
        let stored = write_security(self.store.as_ref(), &upsert);

        let result = if stored {
            LookupResult::empty(isin, LookupStatus::Success)
        } else {
            LookupResult::failed(isin, ErrorCategory::DatabaseError, "Failed to update database")
        };

        LookupResult {
            warnings,
            ..result.with_resolved(resolved)
        }
    }
}

fn resolve(instrument: &FigiInstrument, security_type: SecurityType) -> ResolvedSecurity {
    let bloomberg_code = build_bloomberg_code(
        instrument.ticker.as_deref(),
        instrument.exch_code.as_deref(),
        Some(security_type.as_str()),
    );
    let data_quality_score = data_quality_score(&QualityFields {
        figi: instrument.figi.as_deref(),
        ticker: instrument.ticker.as_deref(),
        bloomberg_code: bloomberg_code.as_deref(),
        security_name: instrument.name.as_deref(),
        exchange_code: instrument.exch_code.as_deref(),
        currency: instrument.currency.as_deref(),
    });

    ResolvedSecurity {
        figi: instrument.figi.clone(),
        ticker: instrument.ticker.clone(),
        bloomberg_code,
        security_name: instrument.name.clone(),
        security_type,
        exchange_code: instrument.exch_code.clone(),
        currency: instrument.currency.clone(),
        data_quality_score,
    }
}

fn audit_entry(
    isin: &str,
    request_payload: &str,
    response: &MappingResponse,
    outcome: &AttemptOutcome,
    elapsed: Duration,
    attempt: u32,
) -> ApiLogEntry {
    let response_payload = response
        .payload()
        .unwrap_or_else(|| {
            json!({
                "error_detail": response.error_message(),
                "response_code": response.status,
            })
        })
        .to_string();

    let (is_success, error_message) = match outcome {
        AttemptOutcome::DataFound(_) => (true, None),
        AttemptOutcome::Warning(warning) => (true, Some(warning.clone())),
        AttemptOutcome::RecoverableError { message, .. }
        | AttemptOutcome::FatalError { message, .. } => (false, Some(message.clone())),
    };

    ApiLogEntry {
        isin: isin.to_string(),
        request_payload: request_payload.to_string(),
        response_payload: Some(response_payload),
        response_code: i32::from(response.status),
        is_success,
        error_message,
        error_category: outcome.category().map(|category| category.label().to_string()),
        processing_time_ms: Some(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)),
        retry_attempt: i32::try_from(attempt).unwrap_or(i32::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openfigi::MappingOutcome;

    fn instrument() -> FigiInstrument {
        FigiInstrument {
            figi: Some(String::from("BBG000B9XRY4")),
            ticker: Some(String::from("AAPL")),
            name: Some(String::from("APPLE INC")),
            exch_code: Some(String::from("US")),
            security_type: Some(String::from("Common Stock")),
            ..FigiInstrument::default()
        }
    }

    #[test]
    fn resolve_derives_bloomberg_code_and_score() {
        let resolved = resolve(&instrument(), SecurityType::Equity);

        assert_eq!(resolved.bloomberg_code.as_deref(), Some("AAPL US Equity"));
        assert_eq!(resolved.data_quality_score, 0.95);
    }

    #[test]
    fn bond_type_uses_corp_suffix() {
        let resolved = resolve(&instrument(), SecurityType::Bond);
        assert_eq!(resolved.bloomberg_code.as_deref(), Some("AAPL US Corp"));
    }

    #[test]
    fn audit_entry_for_data_has_no_error() {
        let response = MappingResponse {
            status: 200,
            outcome: MappingOutcome::Instrument(instrument()),
        };
        let outcome = classify(&response);
        let elapsed = Duration::from_millis(12);
        let entry = audit_entry("US0378331005", "[]", &response, &outcome, elapsed, 2);

        assert!(entry.is_success);
        assert_eq!(entry.error_message, None);
        assert_eq!(entry.error_category, None);
        assert_eq!(entry.retry_attempt, 2);
        assert_eq!(entry.processing_time_ms, Some(12));
        assert!(entry.response_payload.unwrap_or_default().contains("BBG000B9XRY4"));
    }

    #[test]
    fn audit_entry_for_failure_records_error_detail() {
        let response = MappingResponse {
            status: 503,
            outcome: MappingOutcome::Failed(String::from("HTTP error: status 503")),
        };
        let outcome = classify(&response);
        let entry = audit_entry("US0378331005", "[]", &response, &outcome, Duration::ZERO, 1);

        assert!(!entry.is_success);
        assert_eq!(entry.error_category.as_deref(), Some("Server Error"));
        let payload: serde_json::Value =
            serde_json::from_str(&entry.response_payload.unwrap_or_default()).expect("json");
        assert_eq!(payload["error_detail"], "HTTP error: status 503");
        assert_eq!(payload["response_code"], 503);
    }

    #[test]
    fn warning_is_a_successful_attempt_with_no_data_category() {
        let response = MappingResponse {
            status: 200,
            outcome: MappingOutcome::Warning(String::from("No identifier found.")),
        };
        let outcome = classify(&response);
        let entry = audit_entry("US0378331005", "[]", &response, &outcome, Duration::ZERO, 1);

        assert!(entry.is_success);
        assert_eq!(entry.error_message.as_deref(), Some("No identifier found."));
        assert_eq!(entry.error_category.as_deref(), Some("No Data"));
    }

    #[test]
    fn result_json_omits_empty_warnings() {
        let result =
            LookupResult::failed("XX", ErrorCategory::ValidationError, "Invalid ISIN format");
        let json = serde_json::to_value(&result).expect("json");

        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["error_category"], "Validation Error");
        assert_eq!(json["attempts_used"], 0);
        assert!(json["response_code"].is_null());
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn execution_error_keeps_the_full_result_shape() {
        let result = LookupResult::execution_error("US0378331005", "warehouse unavailable");
        let json = serde_json::to_value(&result).expect("json");

        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["error_category"], "Execution Error");
        assert_eq!(json["error_message"], "warehouse unavailable");
        assert_eq!(json["attempts_used"], 0);
        assert!(json["figi"].is_null());
        assert!(json["data_quality_score"].is_null());
        assert!(json["response_code"].is_null());
    }
}
