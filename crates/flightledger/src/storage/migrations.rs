//! Database migration system for flightledger.
//!
//! The schema version lives in the `metadata` table. Pending migrations run
//! in one transaction, so a failed upgrade leaves the previous version intact.

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::{COUNTER_GUARD_STATEMENTS, SCHEMA_STATEMENTS, SESSION_INDEX_STATEMENTS};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 3;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Bring the database schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if schema creation or migration fails, or if the stored
/// version is newer than this build understands.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    // Concurrent openers queue on the busy timeout.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // The metadata table has to exist before the version can be read.
    for statement in SCHEMA_STATEMENTS {
        tx.execute(statement, [])?;
    }

    let version = get_schema_version(&tx)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    if version < CURRENT_VERSION {
        run_migrations(&tx, version)?;
        info!(
            "Migrated schema from version {} to {}",
            version, CURRENT_VERSION
        );
    }

    tx.commit()?;
    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        None => Ok(0),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn run_migrations(tx: &Transaction<'_>, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        debug!("Running migration {}", version);
        run_migration(tx, version)?;
    }
    set_schema_version(tx, CURRENT_VERSION)
}

fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        3 => migrate_v3(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Version 1 is the base schema, created by `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)
}

/// Version 2 adds the session lookup indexes.
fn migrate_v2(conn: &Connection) -> Result<()> {
    for statement in SESSION_INDEX_STATEMENTS {
        conn.execute(statement, [])?;
    }
    set_schema_version(conn, 2)
}

/// Version 3 guards the hour counters against overflowing into REAL.
fn migrate_v3(conn: &Connection) -> Result<()> {
    for statement in COUNTER_GUARD_STATEMENTS {
        conn.execute(statement, [])?;
    }
    set_schema_version(conn, 3)
}
