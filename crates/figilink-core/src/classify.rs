//! Derivation helpers and attempt classification.
//!
//! Everything here is pure: no I/O, no logging, no failure modes beyond
//! the values returned.

use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::domain::SecurityType;
use crate::openfigi::{FigiInstrument, MappingOutcome, MappingResponse};
use crate::validation::{
    is_valid_currency_code, is_valid_exchange_code, is_valid_figi, is_valid_security_name,
    is_valid_ticker,
};

/// Error taxonomy shared by attempt classification, lookup results and
/// the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    UnknownError,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    ServerError,
    NetworkError,
    ClientError,
    HttpError,
    OpenFigiError,
    ApiAnomaly,
    NoData,
    ValidationError,
    DatabaseError,
    ExecutionError,
}

impl ErrorCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown Error",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::RateLimited => "Rate Limited",
            Self::ServerError => "Server Error",
            Self::NetworkError => "Network Error",
            Self::ClientError => "Client Error",
            Self::HttpError => "HTTP Error",
            Self::OpenFigiError => "OpenFIGI Error",
            Self::ApiAnomaly => "API Anomaly",
            Self::NoData => "No Data",
            Self::ValidationError => "Validation Error",
            Self::DatabaseError => "Database Error",
            Self::ExecutionError => "Execution Error",
        }
    }

    /// Category for an HTTP status; `0` means no response was obtained.
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            None => Self::UnknownError,
            Some(0) => Self::NetworkError,
            Some(400) => Self::BadRequest,
            Some(401) => Self::Unauthorized,
            Some(403) => Self::Forbidden,
            Some(404) => Self::NotFound,
            Some(429) => Self::RateLimited,
            Some(500..=599) => Self::ServerError,
            Some(400..=499) => Self::ClientError,
            Some(_) => Self::HttpError,
        }
    }

    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError | Self::NetworkError
        )
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ErrorCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Classified result of one API attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    DataFound(FigiInstrument),
    Warning(String),
    RecoverableError {
        category: ErrorCategory,
        message: String,
    },
    FatalError {
        category: ErrorCategory,
        message: String,
    },
}

impl AttemptOutcome {
    /// Whether another attempt may change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RecoverableError { .. })
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::DataFound(_) => None,
            Self::Warning(_) => Some(ErrorCategory::NoData),
            Self::RecoverableError { category, .. } | Self::FatalError { category, .. } => {
                Some(*category)
            }
        }
    }
}

const MISSING_FIGI_MESSAGE: &str = "No data found for ISIN or unexpected response structure";

/// Classify one mapping response.
///
/// Errors carried inside an HTTP 200 body are never retried: the API's
/// own `error` field is an OpenFIGI Error, a malformed body (including a
/// data entry without a FIGI) is an API Anomaly. Non-200 failures take
/// the status category and are recoverable only when that category is.
pub fn classify(response: &MappingResponse) -> AttemptOutcome {
    match &response.outcome {
        MappingOutcome::Instrument(instrument) => match instrument.figi.as_deref() {
            Some(figi) if !figi.trim().is_empty() => AttemptOutcome::DataFound(instrument.clone()),
            _ => AttemptOutcome::FatalError {
                category: ErrorCategory::ApiAnomaly,
                message: String::from(MISSING_FIGI_MESSAGE),
            },
        },
        MappingOutcome::Warning(warning) => AttemptOutcome::Warning(warning.clone()),
        MappingOutcome::ApiError(message) => AttemptOutcome::FatalError {
            category: ErrorCategory::OpenFigiError,
            message: message.clone(),
        },
        MappingOutcome::Anomaly(message) => AttemptOutcome::FatalError {
            category: ErrorCategory::ApiAnomaly,
            message: message.clone(),
        },
        MappingOutcome::Failed(message) => {
            let category = ErrorCategory::from_status(Some(response.status));
            let message = message.clone();
            if category.is_retryable() {
                AttemptOutcome::RecoverableError { category, message }
            } else {
                AttemptOutcome::FatalError { category, message }
            }
        }
    }
}

/// `securityType` that could not be mapped; the record is stored as
/// `UNKNOWN` and the lookup carries this as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnmappedSecurityType {
    #[error("no security type in OpenFIGI response, stored as UNKNOWN")]
    Missing,

    #[error("unmapped security type '{label}', stored as UNKNOWN")]
    Unrecognized { label: String },
}

/// Map an OpenFIGI `securityType` label onto [`SecurityType`].
///
/// The literal `UNKNOWN` maps to `Unknown`. A missing or blank label and
/// any other unrecognized label are returned as errors so the caller can
/// surface them as warnings.
pub fn map_security_type(label: Option<&str>) -> Result<SecurityType, UnmappedSecurityType> {
    let Some(label) = label.map(str::trim).filter(|label| !label.is_empty()) else {
        return Err(UnmappedSecurityType::Missing);
    };

    let mapped = match label.to_uppercase().as_str() {
        "COMMON STOCK" | "PREFERRED STOCK" | "ADR" => SecurityType::Equity,
        "CORP" | "GOVERNMENT BOND" | "MUNI" | "POOL" => SecurityType::Bond,
        "MUTUAL FUND" | "ETF" | "ETP" => SecurityType::Fund,
        "INDEX" => SecurityType::Index,
        "CURRENCY" => SecurityType::Currency,
        "COMMODITY" => SecurityType::Commodity,
        "UNKNOWN" => SecurityType::Unknown,
        _ => {
            return Err(UnmappedSecurityType::Unrecognized {
                label: label.to_string(),
            })
        }
    };

    Ok(mapped)
}

fn bloomberg_suffix(type_label: Option<&str>) -> &'static str {
    let label = type_label.map(|label| label.trim().to_uppercase());
    match label.as_deref() {
        Some("BOND") | Some("CORP") => "Corp",
        Some("GOVT") => "Govt",
        Some("INDEX") => "Index",
        Some("CURRENCY") => "Curncy",
        Some("COMMODITY") => "Comdty",
        _ => "Equity",
    }
}

/// `"<TICKER> <EXCH> <Suffix>"`, or `None` unless both ticker and
/// exchange code are valid.
pub fn build_bloomberg_code(
    ticker: Option<&str>,
    exchange_code: Option<&str>,
    type_label: Option<&str>,
) -> Option<String> {
    let ticker = ticker.filter(|ticker| is_valid_ticker(ticker))?;
    let exchange = exchange_code.filter(|exchange| is_valid_exchange_code(exchange))?;

    Some(format!(
        "{} {} {}",
        ticker.trim().to_uppercase(),
        exchange.trim().to_uppercase(),
        bloomberg_suffix(type_label)
    ))
}

/// Fields considered by [`data_quality_score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityFields<'a> {
    pub figi: Option<&'a str>,
    pub ticker: Option<&'a str>,
    pub bloomberg_code: Option<&'a str>,
    pub security_name: Option<&'a str>,
    pub exchange_code: Option<&'a str>,
    pub currency: Option<&'a str>,
}

/// Completeness score in `[0.0, 1.0]`, two decimal places.
pub fn data_quality_score(fields: &QualityFields<'_>) -> f64 {
    // Weights in hundredths.
    let mut score: u32 = 0;

    if fields.figi.is_some_and(is_valid_figi) {
        score += 30;
    }
    if fields.ticker.is_some_and(is_valid_ticker) {
        score += 20;
    }
    if fields.bloomberg_code.is_some() {
        score += 20;
    }
    let named = fields.security_name.is_some_and(|name| {
        is_valid_security_name(name) && !name.trim().eq_ignore_ascii_case("unknown")
    });
    if named {
        score += 15;
    }
    if fields.exchange_code.is_some_and(is_valid_exchange_code) {
        score += 10;
    }
    if fields.currency.is_some_and(is_valid_currency_code) {
        score += 5;
    }

    f64::from(score.min(100)) / 100.0
}
