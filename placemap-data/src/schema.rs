#![forbid(unsafe_code)]

use rusqlite::{Connection, Error as SqliteError, OptionalExtension};
use thiserror::Error;

/// Version of the places schema this crate materialises.
pub const SCHEMA_VERSION: i64 = 1;

/// Initialise the places schema inside a SQLite database.
///
/// Creates the `places` table, the query indexes, and the version table
/// inside one transaction. Initialisation is idempotent; an existing
/// installation must already match the expected version, and mismatches are
/// rejected so migrations can be applied explicitly.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use placemap_data::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create places schema");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM places_schema_version LIMIT 1", [], |row| {
///         row.get(0)
///     })
///     .expect("read schema version");
/// assert_eq!(version, 1);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), PlacesSchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| PlacesSchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_places_table(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| PlacesSchemaError::Migration {
            step: "commit schema transaction",
            source,
        })?;

    Ok(())
}

fn create_places_table(transaction: &rusqlite::Transaction<'_>) -> Result<(), PlacesSchemaError> {
    run_migration_step(
        transaction,
        "create places",
        "CREATE TABLE IF NOT EXISTS places (
            id TEXT PRIMARY KEY CHECK (length(trim(id)) > 0),
            name TEXT NOT NULL,
            address TEXT,
            category TEXT NOT NULL,
            city TEXT NOT NULL,
            lng REAL NOT NULL,
            lat REAL NOT NULL,
            properties TEXT NOT NULL DEFAULT '{}'
        ) WITHOUT ROWID",
    )
}

fn create_indexes(transaction: &rusqlite::Transaction<'_>) -> Result<(), PlacesSchemaError> {
    run_migration_step(
        transaction,
        "index places by city",
        "CREATE INDEX IF NOT EXISTS idx_places_city
            ON places(city, category)",
    )?;
    run_migration_step(
        transaction,
        "index places by category",
        "CREATE INDEX IF NOT EXISTS idx_places_category
            ON places(category)",
    )?;
    run_migration_step(
        transaction,
        "index places by coordinates",
        "CREATE INDEX IF NOT EXISTS idx_places_lng_lat
            ON places(lng, lat)",
    )
}

fn ensure_schema_version(transaction: &rusqlite::Transaction<'_>) -> Result<(), PlacesSchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS places_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM places_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| PlacesSchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(PlacesSchemaError::VersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            });
        }
        None => {
            transaction
                .execute(
                    "INSERT INTO places_schema_version (version) VALUES (?1)",
                    [SCHEMA_VERSION],
                )
                .map_err(|source| PlacesSchemaError::Migration {
                    step: "record schema version",
                    source,
                })?;
        }
    }

    Ok(())
}

fn run_migration_step(
    transaction: &rusqlite::Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), PlacesSchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| PlacesSchemaError::Migration { step, source })
}

/// Errors raised when initialising the places schema.
#[derive(Debug, Error)]
pub enum PlacesSchemaError {
    /// A migration step failed to execute.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Name of the failing step.
        step: &'static str,
        /// Source error returned by SQLite.
        #[source]
        source: SqliteError,
    },
    /// The database already carries an incompatible schema version.
    #[error(
        "expected places schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this crate materialises.
        expected: i64,
        /// Version found in the database.
        found: i64,
    },
}
