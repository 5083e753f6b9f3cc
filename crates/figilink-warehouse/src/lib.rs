//! # Figilink Warehouse
//!
//! DuckDB-backed persistence for ISIN → FIGI lookups.
//!
//! ## Overview
//!
//! The warehouse owns two tables:
//!
//! | Table | Description |
//! |-------|-------------|
//! | `openfigi_api_log` | Append-only audit trail, one row per API attempt |
//! | `securities` | One row per ISIN holding the latest resolved FIGI data |
//!
//! Every write is its own transaction. An audit row and the security
//! upsert that follows it are not atomic with each other.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use figilink_warehouse::{ApiLogEntry, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     let log_id = warehouse.log_api_call(&ApiLogEntry {
//!         isin: "US0378331005".to_string(),
//!         request_payload: r#"[{"idType":"ID_ISIN","idValue":"US0378331005"}]"#.to_string(),
//!         response_payload: None,
//!         response_code: 0,
//!         is_success: false,
//!         error_message: Some("Request exception: timed out".to_string()),
//!         error_category: Some("Network Error".to_string()),
//!         processing_time_ms: Some(10_000),
//!         retry_attempt: 1,
//!     })?;
//!     println!("logged attempt {log_id}");
//!     Ok(())
//! }
//! ```
//!
//! ## Security
//!
//! All values are bound as query parameters; nothing supplied by the API or
//! the caller is interpolated into SQL text.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use ::duckdb::{params, Connection, ToSql};
use serde::Serialize;
use thiserror::Error;

pub use duckdb::DuckDbConnectionFactory;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (creating the data directory).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for figilink data.
    pub figilink_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let figilink_home = resolve_figilink_home();
        let db_path = env::var("FIGILINK_DB_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| figilink_home.join("figilink.duckdb"));
        Self {
            figilink_home,
            db_path,
        }
    }
}

impl WarehouseConfig {
    /// Use an explicit database file, keeping the default home directory.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
            ..Self::default()
        }
    }
}

/// One audit-log row describing a single API attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiLogEntry {
    pub isin: String,
    /// Serialized outbound request body.
    pub request_payload: String,
    /// Serialized response payload or error detail.
    pub response_payload: Option<String>,
    /// HTTP status, `0` when no response was obtained.
    pub response_code: i32,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub error_category: Option<String>,
    pub processing_time_ms: Option<i64>,
    /// 1-based attempt sequence number.
    pub retry_attempt: i32,
}

/// Sanitized security fields ready to be merged into `securities`.
///
/// `None` means "absent": inserts write NULL (or the column default) and
/// updates keep the stored value, except for `figi` and `bloomberg_code`
/// which are always overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityUpsert {
    pub isin: String,
    pub figi: Option<String>,
    pub ticker: Option<String>,
    pub bloomberg_code: Option<String>,
    pub security_name: Option<String>,
    pub security_type: Option<String>,
    pub exchange_code: Option<String>,
    pub currency: Option<String>,
    pub data_quality_score: f64,
    pub processing_attempts: i64,
}

/// Which branch of the upsert was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Inserted,
    Updated,
}

/// A security row as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSecurity {
    pub security_id: i64,
    pub isin: String,
    pub figi: Option<String>,
    pub ticker: Option<String>,
    pub bloomberg_code: Option<String>,
    pub security_name: String,
    pub security_type: String,
    pub exchange_code: Option<String>,
    pub currency: Option<String>,
    pub data_quality_score: f64,
    pub processing_attempts: i64,
    pub last_processing_attempt: Option<String>,
    pub last_figi_update: Option<String>,
    pub created_date: String,
    pub modified_date: String,
}

/// An audit-log row as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiLogRow {
    pub log_id: i64,
    pub isin: String,
    pub request_payload: String,
    pub response_payload: Option<String>,
    pub response_code: i32,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub error_category: Option<String>,
    pub response_timestamp: String,
    pub processing_time_ms: Option<i64>,
    pub retry_attempt: i32,
}

/// The main warehouse interface.
#[derive(Clone)]
pub struct Warehouse {
    factory: DuckDbConnectionFactory,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let factory = DuckDbConnectionFactory::open(config.db_path)?;
        Self::from_factory(factory)
    }

    /// Open a throwaway in-memory warehouse.
    pub fn in_memory() -> Result<Self, WarehouseError> {
        Self::from_factory(DuckDbConnectionFactory::in_memory()?)
    }

    fn from_factory(factory: DuckDbConnectionFactory) -> Result<Self, WarehouseError> {
        let warehouse = Self { factory };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.factory.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Path to the database file, `None` when in memory.
    pub fn db_path(&self) -> Option<&std::path::Path> {
        self.factory.db_path()
    }

    /// Append one audit-log row and return its generated `log_id`.
    pub fn log_api_call(&self, entry: &ApiLogEntry) -> Result<i64, WarehouseError> {
        let connection = self.factory.acquire()?;
        let params: [&dyn ToSql; 9] = [
            &entry.isin,
            &entry.request_payload,
            &entry.response_payload,
            &entry.response_code,
            &entry.is_success,
            &entry.error_message,
            &entry.error_category,
            &entry.processing_time_ms,
            &entry.retry_attempt,
        ];
        let log_id = connection.query_row(
            "INSERT INTO openfigi_api_log \
             (isin, request_payload, response_payload, response_code, is_success, \
              error_message, error_category, response_timestamp, processing_time_ms, \
              retry_attempt) \
             VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, ?, ?) \
             RETURNING log_id",
            params.as_slice(),
            |row| row.get::<_, i64>(0),
        )?;
        Ok(log_id)
    }

    /// Insert the security if its ISIN is new, otherwise merge the fields.
    pub fn upsert_security(
        &self,
        security: &SecurityUpsert,
    ) -> Result<UpsertAction, WarehouseError> {
        let connection = self.factory.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<UpsertAction, WarehouseError> {
            let existing: i64 = connection.query_row(
                "SELECT COUNT(*) FROM securities WHERE isin = ?",
                params![security.isin],
                |row| row.get(0),
            )?;

            if existing > 0 {
                update_security(&connection, security)?;
                Ok(UpsertAction::Updated)
            } else {
                insert_security(&connection, security)?;
                Ok(UpsertAction::Inserted)
            }
        })();

        finalize_transaction(&connection, result)
    }

    /// Fetch the stored security for an ISIN.
    pub fn get_security(&self, isin: &str) -> Result<Option<StoredSecurity>, WarehouseError> {
        let connection = self.factory.acquire()?;
        let security = connection.query_row(
            "SELECT security_id, isin, figi, ticker, bloomberg_code, security_name, \
                    security_type, exchange_code, currency, data_quality_score, \
                    processing_attempts, \
                    CAST(last_processing_attempt AS VARCHAR), \
                    CAST(last_figi_update AS VARCHAR), \
                    CAST(created_date AS VARCHAR), \
                    CAST(modified_date AS VARCHAR) \
             FROM securities WHERE isin = ?",
            params![isin],
            |row| {
                Ok(StoredSecurity {
                    security_id: row.get(0)?,
                    isin: row.get(1)?,
                    figi: row.get(2)?,
                    ticker: row.get(3)?,
                    bloomberg_code: row.get(4)?,
                    security_name: row.get(5)?,
                    security_type: row.get(6)?,
                    exchange_code: row.get(7)?,
                    currency: row.get(8)?,
                    data_quality_score: row.get(9)?,
                    processing_attempts: row.get(10)?,
                    last_processing_attempt: row.get(11)?,
                    last_figi_update: row.get(12)?,
                    created_date: row.get(13)?,
                    modified_date: row.get(14)?,
                })
            },
        );

        match security {
            Ok(security) => Ok(Some(security)),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Number of security rows for an ISIN. Never more than one.
    pub fn count_securities(&self, isin: &str) -> Result<i64, WarehouseError> {
        let connection = self.factory.acquire()?;
        let count = connection.query_row(
            "SELECT COUNT(*) FROM securities WHERE isin = ?",
            params![isin],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recent audit-log rows for an ISIN, newest first.
    pub fn recent_api_log(
        &self,
        isin: &str,
        limit: usize,
    ) -> Result<Vec<ApiLogRow>, WarehouseError> {
        let connection = self.factory.acquire()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut statement = connection.prepare(
            "SELECT log_id, isin, request_payload, response_payload, response_code, is_success, \
                    error_message, error_category, CAST(response_timestamp AS VARCHAR), \
                    processing_time_ms, retry_attempt \
             FROM openfigi_api_log \
             WHERE isin = ? \
             ORDER BY log_id DESC \
             LIMIT ?",
        )?;
        let rows = statement.query_map(params![isin, limit], |row| {
            Ok(ApiLogRow {
                log_id: row.get(0)?,
                isin: row.get(1)?,
                request_payload: row.get(2)?,
                response_payload: row.get(3)?,
                response_code: row.get(4)?,
                is_success: row.get(5)?,
                error_message: row.get(6)?,
                error_category: row.get(7)?,
                response_timestamp: row.get(8)?,
                processing_time_ms: row.get(9)?,
                retry_attempt: row.get(10)?,
            })
        })?;

        let mut log = Vec::new();
        for row in rows {
            log.push(row?);
        }
        Ok(log)
    }
}

fn insert_security(
    connection: &Connection,
    security: &SecurityUpsert,
) -> Result<(), WarehouseError> {
    let security_name = security.security_name.as_deref().unwrap_or("Unknown");
    let security_type = security.security_type.as_deref().unwrap_or("UNKNOWN");
    let params: [&dyn ToSql; 10] = [
        &security.isin,
        &security.figi,
        &security.ticker,
        &security.bloomberg_code,
        &security_name,
        &security_type,
        &security.exchange_code,
        &security.currency,
        &security.data_quality_score,
        &security.processing_attempts,
    ];
    connection.execute(
        "INSERT INTO securities \
         (isin, figi, ticker, bloomberg_code, security_name, security_type, exchange_code, \
          currency, data_quality_score, processing_attempts, last_figi_update, \
          last_processing_attempt, created_date, modified_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
                 CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
        params.as_slice(),
    )?;
    Ok(())
}

fn update_security(
    connection: &Connection,
    security: &SecurityUpsert,
) -> Result<(), WarehouseError> {
    let params: [&dyn ToSql; 10] = [
        &security.figi,
        &security.bloomberg_code,
        &security.ticker,
        &security.security_name,
        &security.exchange_code,
        &security.currency,
        &security.data_quality_score,
        &security.processing_attempts,
        &security.security_type,
        &security.isin,
    ];
    connection.execute(
        "UPDATE securities \
         SET figi = ?, \
             bloomberg_code = ?, \
             ticker = COALESCE(?, ticker), \
             security_name = COALESCE(?, security_name), \
             exchange_code = COALESCE(?, exchange_code), \
             currency = COALESCE(?, currency), \
             data_quality_score = ?, \
             processing_attempts = ?, \
             security_type = COALESCE(?, security_type), \
             last_figi_update = CURRENT_TIMESTAMP, \
             last_processing_attempt = CURRENT_TIMESTAMP, \
             modified_date = CURRENT_TIMESTAMP \
         WHERE isin = ?",
        params.as_slice(),
    )?;
    Ok(())
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_figilink_home() -> PathBuf {
    figilink_home_from(
        env::var_os("FIGILINK_HOME"),
        env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")),
    )
}

fn figilink_home_from(figilink_home: Option<OsString>, user_home: Option<OsString>) -> PathBuf {
    if let Some(path) = figilink_home {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = user_home {
        return PathBuf::from(home).join(".figilink");
    }

    PathBuf::from(".figilink")
}
