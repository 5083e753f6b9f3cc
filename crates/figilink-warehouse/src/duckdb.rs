//! `DuckDB` connection factory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ::duckdb::Connection;

struct FactoryInner {
    db_path: Option<PathBuf>,
    root: Mutex<Connection>,
}

/// Hands out connections that share one underlying `DuckDB` database.
///
/// The database is opened once; every [`acquire`](Self::acquire) clones a
/// connection off the root so that file and in-memory databases behave the
/// same way.
#[derive(Clone)]
pub struct DuckDbConnectionFactory {
    inner: Arc<FactoryInner>,
}

impl DuckDbConnectionFactory {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ::duckdb::Error> {
        let path = path.into();
        let root = Connection::open(path.as_path())?;
        configure_connection(&root)?;
        Ok(Self::from_root(Some(path), root))
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    ///
    /// # Errors
    /// Returns an error if `DuckDB` cannot allocate the database.
    pub fn in_memory() -> Result<Self, ::duckdb::Error> {
        let root = Connection::open_in_memory()?;
        configure_connection(&root)?;
        Ok(Self::from_root(None, root))
    }

    fn from_root(db_path: Option<PathBuf>, root: Connection) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                db_path,
                root: Mutex::new(root),
            }),
        }
    }

    /// Acquire a fresh connection to the shared database.
    ///
    /// # Errors
    /// Returns an error if `DuckDB` refuses to clone the root connection.
    pub fn acquire(&self) -> Result<Connection, ::duckdb::Error> {
        let root = self
            .inner
            .root
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        root.try_clone()
    }

    /// Path of the database file, `None` for in-memory databases.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.inner.db_path.as_deref()
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}
