//! OpenFIGI v3 `/mapping` client.
//!
//! One call maps exactly one ISIN. The HTTP exchange is folded into a
//! [`MappingResponse`]; this module never returns `Err` to its caller.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::{duration_ms_from_env, string_from_env};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::validation::is_valid_isin;
use crate::ValidationError;

pub const DEFAULT_API_URL: &str = "https://api.openfigi.com/v3/mapping";
pub const API_KEY_HEADER: &str = "X-OPENFIGI-APIKEY";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the OpenFIGI API.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenFigiConfig {
    api_key: Option<String>,
    api_url: String,
    request_timeout: Duration,
}

impl OpenFigiConfig {
    /// Config for the public endpoint. A blank key counts as "not configured".
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            api_url: String::from(DEFAULT_API_URL),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read `OPENFIGI_API_KEY`, `OPENFIGI_API_URL` and `OPENFIGI_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ValidationError> {
        let config = Self::new(string_from_env("OPENFIGI_API_KEY"))
            .with_timeout(duration_ms_from_env("OPENFIGI_TIMEOUT_MS", DEFAULT_TIMEOUT)?);
        match string_from_env("OPENFIGI_API_URL") {
            Some(url) => config.with_api_url(url),
            None => Ok(config),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Result<Self, ValidationError> {
        let api_url = api_url.into();
        if api_url.trim().is_empty() {
            return Err(ValidationError::EmptyApiUrl);
        }
        self.api_url = api_url.trim().to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Debug for OpenFigiConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFigiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// One instrument from the `data` array of a mapping result.
///
/// Unrecognized keys are kept in `extra` so the audit log stores the full
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FigiInstrument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(rename = "exchCode", skip_serializing_if = "Option::is_none")]
    pub exch_code: Option<String>,
    #[serde(rename = "securityType", skip_serializing_if = "Option::is_none")]
    pub security_type: Option<String>,
    #[serde(rename = "securityType2", skip_serializing_if = "Option::is_none")]
    pub security_type2: Option<String>,
    #[serde(rename = "marketSector", skip_serializing_if = "Option::is_none")]
    pub market_sector: Option<String>,
    #[serde(rename = "compositeFIGI", skip_serializing_if = "Option::is_none")]
    pub composite_figi: Option<String>,
    #[serde(rename = "shareClassFIGI", skip_serializing_if = "Option::is_none")]
    pub share_class_figi: Option<String>,
    #[serde(rename = "securityDescription", skip_serializing_if = "Option::is_none")]
    pub security_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a single mapping call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingOutcome {
    /// First element of the `data` array.
    Instrument(FigiInstrument),
    /// The API's `warning` field, e.g. "No identifier found.".
    Warning(String),
    /// The API's own `error` field inside an HTTP 200 body.
    ApiError(String),
    /// HTTP 200 whose body did not have the documented shape.
    Anomaly(String),
    /// No usable response: missing key, invalid ISIN, transport failure or
    /// a non-200 status.
    Failed(String),
}

/// Status code plus outcome of one mapping call.
///
/// `status` is `0` when no HTTP response was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingResponse {
    pub status: u16,
    pub outcome: MappingOutcome,
}

impl MappingResponse {
    fn new(status: u16, outcome: MappingOutcome) -> Self {
        Self { status, outcome }
    }

    /// Success payload: the instrument, or `{"warning": ...}`.
    pub fn payload(&self) -> Option<Value> {
        match &self.outcome {
            MappingOutcome::Instrument(instrument) => serde_json::to_value(instrument).ok(),
            MappingOutcome::Warning(warning) => Some(json!({ "warning": warning })),
            _ => None,
        }
    }

    /// Error text; `None` whenever [`payload`](Self::payload) is `Some`.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            MappingOutcome::ApiError(message)
            | MappingOutcome::Anomaly(message)
            | MappingOutcome::Failed(message) => Some(message),
            MappingOutcome::Instrument(_) | MappingOutcome::Warning(_) => None,
        }
    }
}

/// Serialized single-item mapping request for an ISIN.
pub fn mapping_request_body(isin: &str) -> String {
    json!([{ "idType": "ID_ISIN", "idValue": isin }]).to_string()
}

#[derive(Debug, Deserialize)]
struct MappingResult {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the OpenFIGI mapping endpoint.
#[derive(Clone)]
pub struct OpenFigiClient {
    http: Arc<dyn HttpClient>,
    config: OpenFigiConfig,
}

impl OpenFigiClient {
    pub fn new(http: Arc<dyn HttpClient>, config: OpenFigiConfig) -> Self {
        Self { http, config }
    }

    pub fn with_reqwest(config: OpenFigiConfig) -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()), config)
    }

    pub fn config(&self) -> &OpenFigiConfig {
        &self.config
    }

    /// Map one ISIN to its FIGI data.
    ///
    /// Missing API key and malformed ISIN fail without touching the network.
    pub async fn map_isin(&self, isin: &str) -> MappingResponse {
        let Some(api_key) = self.config.api_key() else {
            return MappingResponse::new(
                0,
                MappingOutcome::Failed(String::from("OpenFIGI API key is not configured.")),
            );
        };

        if !is_valid_isin(isin) {
            return MappingResponse::new(
                400,
                MappingOutcome::Failed(String::from("Invalid ISIN format for API call")),
            );
        }

        let request = HttpRequest::post(self.config.api_url())
            .with_header(API_KEY_HEADER, api_key)
            .with_json_body(mapping_request_body(isin))
            .with_timeout(self.config.request_timeout());

        tracing::debug!(isin, url = self.config.api_url(), "calling OpenFIGI mapping");

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(isin, error = %error, "OpenFIGI transport failure");
                return MappingResponse::new(
                    0,
                    MappingOutcome::Failed(format!("Request exception: {}", error.message())),
                );
            }
        };

        if response.status != 200 {
            let detail = http_error_detail(response.status, &response.body);
            return MappingResponse::new(
                response.status,
                MappingOutcome::Failed(format!("HTTP error: {detail}")),
            );
        }

        MappingResponse::new(200, parse_success_body(&response.body))
    }
}

fn parse_success_body(body: &str) -> MappingOutcome {
    let Ok(decoded) = serde_json::from_str::<Value>(body) else {
        return MappingOutcome::Anomaly(String::from(
            "Failed to decode JSON response from OpenFIGI for a 200 OK.",
        ));
    };

    let Some(first) = decoded.as_array().and_then(|items| items.first()).cloned() else {
        return MappingOutcome::Anomaly(String::from(
            "Empty or invalid response structure from OpenFIGI",
        ));
    };

    let unexpected = || {
        MappingOutcome::Anomaly(String::from(
            "No data found for ISIN or unexpected response structure",
        ))
    };

    let Ok(result) = serde_json::from_value::<MappingResult>(first) else {
        return unexpected();
    };

    if let Some(instrument) = result
        .data
        .as_ref()
        .and_then(|data| data.first())
        .filter(|entry| is_truthy(entry))
    {
        return match serde_json::from_value::<FigiInstrument>(instrument.clone()) {
            Ok(instrument) => MappingOutcome::Instrument(instrument),
            Err(_) => unexpected(),
        };
    }

    if let Some(warning) = result.warning {
        return MappingOutcome::Warning(warning);
    }

    if let Some(error) = result.error {
        return MappingOutcome::ApiError(error);
    }

    unexpected()
}

/// Prefer the structured error text from the body over the bare status.
fn http_error_detail(status: u16, body: &str) -> String {
    let structured = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        match &value {
            Value::Array(items) => items
                .first()
                .and_then(|item| item.get("error"))
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            Value::Object(object) => object
                .get("message")
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            _ => None,
        }
    });

    structured.unwrap_or_else(|| format!("status {status}"))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(object) => !object.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(text) => !text.is_empty(),
        Value::Bool(flag) => *flag,
        Value::Number(_) => true,
    }
}
