//! # Figilink Core
//!
//! Resolves ISINs to FIGI identifiers through the OpenFIGI mapping API.
//!
//! ## Overview
//!
//! A lookup validates the identifier, calls OpenFIGI with bounded linear
//! retries, records every attempt in an append-only audit log and merges
//! the resolved fields into a deduplicated securities table.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`classify`] | Error categories, attempt classification, derived fields |
//! | [`domain`] | Domain models (`Isin`, `SecurityType`) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`lookup`] | Lookup orchestration and result record |
//! | [`openfigi`] | OpenFIGI `/v3/mapping` client |
//! | [`persistence`] | Best-effort audit and upsert writers |
//! | [`retry`] | Retry policy |
//! | [`validation`] | Field validators |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use figilink_core::{IsinLookup, OpenFigiClient, OpenFigiConfig, RetryPolicy, Warehouse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenFigiClient::with_reqwest(OpenFigiConfig::from_env()?);
//!     let warehouse = Warehouse::open_default()?;
//!     let lookup = IsinLookup::new(client, Arc::new(warehouse), RetryPolicy::from_env()?);
//!
//!     let result = lookup.lookup("US0378331005").await;
//!     println!("{}", serde_json::to_string(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is read from `OPENFIGI_API_KEY` and never logged
//! - HTTP requests use TLS via rustls

pub mod classify;
mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod lookup;
pub mod openfigi;
pub mod persistence;
pub mod retry;
pub mod validation;

pub use classify::{
    build_bloomberg_code, classify, data_quality_score, map_security_type, AttemptOutcome,
    ErrorCategory, QualityFields, UnmappedSecurityType,
};

pub use domain::{Isin, SecurityType};

pub use error::{CoreError, ValidationError};

// Warehouse (re-exported from figilink-warehouse)
pub use figilink_warehouse::{
    ApiLogEntry, ApiLogRow, SecurityUpsert, StoredSecurity, UpsertAction, Warehouse,
    WarehouseConfig, WarehouseError,
};

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use lookup::{IsinLookup, LookupOptions, LookupResult, LookupStatus};

pub use openfigi::{
    FigiInstrument, MappingOutcome, MappingResponse, OpenFigiClient, OpenFigiConfig,
    API_KEY_HEADER, DEFAULT_API_URL,
};

pub use persistence::{LookupStore, ResolvedSecurity, SecurityUpsertExt};

pub use retry::RetryPolicy;
