use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_securities",
        sql: r#"
CREATE SEQUENCE IF NOT EXISTS securities_id_seq START 1;

CREATE TABLE IF NOT EXISTS securities (
    security_id BIGINT NOT NULL DEFAULT nextval('securities_id_seq'),
    isin TEXT PRIMARY KEY,
    figi TEXT,
    ticker TEXT,
    bloomberg_code TEXT,
    security_name TEXT NOT NULL DEFAULT 'Unknown',
    security_type TEXT NOT NULL DEFAULT 'UNKNOWN',
    exchange_code TEXT,
    currency TEXT,
    data_quality_score DOUBLE NOT NULL DEFAULT 0.0,
    processing_attempts BIGINT NOT NULL DEFAULT 0,
    last_processing_attempt TIMESTAMP,
    last_figi_update TIMESTAMP,
    created_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    modified_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_openfigi_api_log",
        sql: r#"
CREATE SEQUENCE IF NOT EXISTS openfigi_api_log_id_seq START 1;

CREATE TABLE IF NOT EXISTS openfigi_api_log (
    log_id BIGINT PRIMARY KEY DEFAULT nextval('openfigi_api_log_id_seq'),
    isin TEXT NOT NULL,
    request_payload TEXT NOT NULL,
    response_payload TEXT,
    response_code INTEGER NOT NULL,
    is_success BOOLEAN NOT NULL,
    error_message TEXT,
    error_category TEXT,
    response_timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    processing_time_ms BIGINT,
    retry_attempt INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_openfigi_api_log_isin ON openfigi_api_log(isin);
"#,
    },
];

/// Apply every migration that is not yet recorded in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying warehouse migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
