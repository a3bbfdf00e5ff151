//! Storage layer for flightledger.
//!
//! This module provides the `SQLite` database that holds the aggregate
//! counters and the session records behind them. [`Storage`] owns the
//! connection; the ledger and the accessors borrow it (or a transaction on
//! it) explicitly per call.

pub mod aggregates;
pub mod migrations;
pub mod schema;
pub mod sessions;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

/// Decimal places kept for stored hours: counters are ten-thousandths of an hour.
pub const HOURS_SCALE: u32 = 4;

const TICKS_PER_HOUR: i64 = 10_i64.pow(HOURS_SCALE);

/// Handle on the ledger database.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a ledger database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and migrates the schema to the current version. `busy_timeout` bounds
    /// how long a writer waits for another connection's transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migration fails.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&mut conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Open the database named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migration fails.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(config.database_path(), config.busy_timeout())
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the connection for reads.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Borrow the connection for operations that open their own transaction.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map_or(0, |m| m.len())
        };

        Ok(StorageStats {
            students: count("SELECT COUNT(*) FROM students")?,
            teachers: count("SELECT COUNT(*) FROM teachers")?,
            aircraft: count("SELECT COUNT(*) FROM aircraft")?,
            sessions: count("SELECT COUNT(*) FROM flight_sessions")?,
            verified_sessions: count(
                "SELECT COUNT(*) FROM flight_sessions WHERE verified_by_instructor = 1",
            )?,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of students.
    pub students: i64,
    /// Number of instructors.
    pub teachers: i64,
    /// Number of aircraft.
    pub aircraft: i64,
    /// Number of sessions.
    pub sessions: i64,
    /// Number of sessions signed off by an instructor.
    pub verified_sessions: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Convert hours to the stored fixed-point tick count.
///
/// Rounds half-to-even at [`HOURS_SCALE`] places. The rounding is symmetric,
/// so `hours_to_ticks(-x) == -hours_to_ticks(x)`.
///
/// # Errors
///
/// Returns [`Error::HoursOutOfRange`] if the value does not fit in an `i64`.
pub fn hours_to_ticks(field: &'static str, hours: Decimal) -> Result<i64> {
    hours
        .round_dp_with_strategy(HOURS_SCALE, RoundingStrategy::MidpointNearestEven)
        .checked_mul(Decimal::from(TICKS_PER_HOUR))
        .and_then(|ticks| ticks.to_i64())
        .ok_or(Error::HoursOutOfRange {
            field,
            value: hours,
        })
}

/// Convert a stored tick count back to hours.
#[must_use]
pub fn ticks_to_hours(ticks: i64) -> Decimal {
    Decimal::new(ticks, HOURS_SCALE).normalize()
}

pub(crate) fn opt_hours_to_ticks(
    field: &'static str,
    hours: Option<Decimal>,
) -> Result<Option<i64>> {
    hours.map(|h| hours_to_ticks(field, h)).transpose()
}

pub(crate) fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
