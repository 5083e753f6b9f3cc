//! Best-effort writers between the lookup loop and the warehouse.
//!
//! Storage failures never abort a lookup. The writers log them at `warn`
//! and hand back a sentinel (`None` / `false`) that the caller inspects.

use figilink_warehouse::{ApiLogEntry, SecurityUpsert, UpsertAction, Warehouse, WarehouseError};
use serde::Serialize;

use crate::domain::SecurityType;
use crate::validation::{
    is_valid_currency_code, is_valid_exchange_code, is_valid_figi, is_valid_security_name,
    is_valid_ticker,
};

/// Storage used by [`IsinLookup`](crate::IsinLookup).
pub trait LookupStore: Send + Sync {
    /// Append one audit-log row, returning its generated id.
    fn record_attempt(&self, entry: &ApiLogEntry) -> Result<i64, WarehouseError>;

    /// Insert or merge the security row for `security.isin`.
    fn upsert_security(&self, security: &SecurityUpsert) -> Result<UpsertAction, WarehouseError>;
}

impl LookupStore for Warehouse {
    fn record_attempt(&self, entry: &ApiLogEntry) -> Result<i64, WarehouseError> {
        self.log_api_call(entry)
    }

    fn upsert_security(&self, security: &SecurityUpsert) -> Result<UpsertAction, WarehouseError> {
        Warehouse::upsert_security(self, security)
    }
}

/// Security fields resolved from a successful mapping, as returned by the
/// API (not yet sanitized).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSecurity {
    pub figi: Option<String>,
    pub ticker: Option<String>,
    pub bloomberg_code: Option<String>,
    pub security_name: Option<String>,
    pub security_type: SecurityType,
    pub exchange_code: Option<String>,
    pub currency: Option<String>,
    pub data_quality_score: f64,
}

/// Construction of a storage-ready [`SecurityUpsert`].
pub trait SecurityUpsertExt {
    /// Drop invalid values instead of storing them verbatim.
    ///
    /// Ticker, exchange and currency are trimmed and upper-cased; an
    /// `Unknown` security type is treated as absent.
    fn sanitized(isin: &str, resolved: &ResolvedSecurity, processing_attempts: u32) -> Self;
}

impl SecurityUpsertExt for SecurityUpsert {
    fn sanitized(isin: &str, resolved: &ResolvedSecurity, processing_attempts: u32) -> Self {
        let upper_if = |value: &Option<String>, valid: fn(&str) -> bool| {
            value
                .as_deref()
                .map(|raw| raw.trim().to_uppercase())
                .filter(|value| valid(value))
        };

        Self {
            isin: isin.to_string(),
            figi: resolved
                .figi
                .as_deref()
                .map(str::trim)
                .filter(|figi| is_valid_figi(figi))
                .map(str::to_string),
            ticker: upper_if(&resolved.ticker, is_valid_ticker),
            bloomberg_code: resolved
                .bloomberg_code
                .as_deref()
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string),
            security_name: resolved
                .security_name
                .as_deref()
                .map(str::trim)
                .filter(|name| is_valid_security_name(name))
                .map(str::to_string),
            security_type: match resolved.security_type {
                SecurityType::Unknown => None,
                known => Some(known.as_str().to_string()),
            },
            exchange_code: upper_if(&resolved.exchange_code, is_valid_exchange_code),
            currency: upper_if(&resolved.currency, is_valid_currency_code),
            data_quality_score: resolved.data_quality_score.clamp(0.0, 1.0),
            processing_attempts: i64::from(processing_attempts),
        }
    }
}

/// Append an audit row; `None` if the store refused it.
pub fn write_audit_log(store: &dyn LookupStore, entry: &ApiLogEntry) -> Option<i64> {
    match store.record_attempt(entry) {
        Ok(log_id) => Some(log_id),
        Err(error) => {
            tracing::warn!(
                isin = %entry.isin,
                attempt = entry.retry_attempt,
                error = %error,
                "failed to write OpenFIGI audit log row"
            );
            None
        }
    }
}

/// Upsert the security row; `false` if the store refused it.
pub fn write_security(store: &dyn LookupStore, security: &SecurityUpsert) -> bool {
    match store.upsert_security(security) {
        Ok(action) => {
            tracing::debug!(isin = %security.isin, ?action, "security record written");
            true
        }
        Err(error) => {
            tracing::warn!(isin = %security.isin, error = %error, "failed to upsert security");
            false
        }
    }
}
