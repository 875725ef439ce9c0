//! Bulk loading of place exports into the places database.
//!
//! The loader consumes the JSON (or JSON Lines) export produced by the
//! upstream build pipeline. Records missing a required field or a
//! resolvable coordinate pair are dropped and counted, never failing the
//! batch; valid records are upserted keyed on `id`, replacing every
//! mutable field.

use std::{
    fs,
    path::{Path, PathBuf},
};

use geo::Coord;
use log::{info, warn};
use placemap_core::{Place, Properties};
use rusqlite::Connection;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{PlacesSchemaError, initialise_schema};

const UPSERT_SQL: &str = "INSERT INTO places (id, name, address, category, city, lng, lat, properties)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT(id) DO UPDATE SET
         name = excluded.name,
         address = excluded.address,
         category = excluded.category,
         city = excluded.city,
         lng = excluded.lng,
         lat = excluded.lat,
         properties = excluded.properties";

/// Outcome of one load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Records upserted (or accepted, during a dry run).
    pub loaded: usize,
    /// Records dropped for missing required fields or coordinates.
    pub skipped: usize,
}

/// Options controlling a load run.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Rows written per transaction.
    pub batch_size: usize,
    /// Force JSON Lines parsing regardless of the file extension.
    pub jsonl: bool,
    /// Parse and count records without touching the database.
    pub dry_run: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            jsonl: false,
            dry_run: false,
        }
    }
}

impl LoadOptions {
    /// Override the number of rows written per transaction.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Force JSON Lines parsing.
    #[must_use]
    pub fn with_jsonl(mut self, jsonl: bool) -> Self {
        self.jsonl = jsonl;
        self
    }

    /// Parse and count without writing.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Errors raised while loading a place export.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading the export file failed.
    #[error("failed to read place export at {path:?}")]
    Read {
        /// Location of the export.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The export was not valid JSON.
    #[error("failed to parse place export at {path:?}")]
    Parse {
        /// Location of the export.
        path: PathBuf,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The export's top level was not a JSON array.
    #[error("export at {path:?} is not a JSON array; use JSON Lines mode for line-delimited input")]
    NotAnArray {
        /// Location of the export.
        path: PathBuf,
    },
    /// A JSON Lines entry failed to parse.
    #[error("failed to parse line {line} of {path:?}")]
    ParseLine {
        /// Location of the export.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A JSON Lines entry was valid JSON but not an object.
    #[error("line {line} of {path:?} is not a JSON object")]
    NotAnObject {
        /// Location of the export.
        path: PathBuf,
        /// One-based line number.
        line: usize,
    },
    /// Opening the target database failed.
    #[error("failed to open places database at {path:?}")]
    Open {
        /// Location of the database.
        path: PathBuf,
        /// Source error returned by SQLite.
        #[source]
        source: rusqlite::Error,
    },
    /// A record's properties could not be re-encoded for storage.
    #[error("failed to encode properties for place {id}")]
    EncodeProperties {
        /// Identifier of the offending record.
        id: String,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The places schema could not be initialised.
    #[error(transparent)]
    Schema(#[from] PlacesSchemaError),
    /// A write failed.
    #[error("failed to {operation}")]
    Sqlite {
        /// Description of the failing operation.
        operation: &'static str,
        /// Source error returned by SQLite.
        #[source]
        source: rusqlite::Error,
    },
}

/// Normalise one raw export record into a [`Place`].
///
/// `id`, `name`, `category`, and `city` must be non-empty strings.
/// Coordinates resolve from the `location` sub-object first, falling back
/// per component to `lat`/`lng` keys inside `properties`; numbers and
/// numeric strings are both accepted. Records failing any of these rules
/// yield `None`. A non-object `properties` value is preserved under a
/// `_raw` key rather than discarded.
///
/// # Examples
/// ```
/// use placemap_data::normalise_record;
/// use serde_json::json;
///
/// let record = json!({
///     "id": "toilet-001",
///     "name": "Riverside Restroom",
///     "category": "toilet",
///     "city": "taipei",
///     "location": {"lat": 25.07, "lng": "121.51"},
/// });
/// let place = normalise_record(&record).expect("record should normalise");
/// assert_eq!(place.location.x, 121.51);
///
/// assert!(normalise_record(&json!({"id": "x"})).is_none());
/// ```
#[must_use]
pub fn normalise_record(record: &Value) -> Option<Place> {
    let object = record.as_object()?;
    let id = non_empty_string(object.get("id"))?;
    let name = non_empty_string(object.get("name"))?;
    let category = non_empty_string(object.get("category"))?;
    let city = non_empty_string(object.get("city"))?;
    let address = object.get("address").and_then(coerce_text);
    let location = resolve_location(object)?;
    let properties = normalise_properties(object.get("properties"));
    Some(Place {
        id,
        name,
        address,
        category,
        city,
        location,
        properties,
    })
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn coerce_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse().ok()
            }
        }
        _ => None,
    }
}

fn resolve_location(object: &Map<String, Value>) -> Option<Coord<f64>> {
    let location = object.get("location").and_then(Value::as_object);
    let fallback = object.get("properties").and_then(Value::as_object);
    let lat = location
        .and_then(|sub| coerce_float(sub.get("lat")))
        .or_else(|| fallback.and_then(|props| coerce_float(props.get("lat"))))?;
    let lng = location
        .and_then(|sub| coerce_float(sub.get("lng")))
        .or_else(|| fallback.and_then(|props| coerce_float(props.get("lng"))))?;
    Some(Coord { x: lng, y: lat })
}

fn normalise_properties(value: Option<&Value>) -> Properties {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            let mut wrapped = Map::new();
            wrapped.insert("_raw".to_owned(), other.clone());
            wrapped
        }
    }
}

/// Load a place export into an open database connection.
///
/// The schema is initialised on demand; records are upserted in batches of
/// `options.batch_size`, one transaction per batch. A dry run parses,
/// normalises, and counts without touching the database.
pub fn load_export(
    connection: &mut Connection,
    input: &Path,
    options: &LoadOptions,
) -> Result<LoadSummary, LoadError> {
    let jsonl = options.jsonl || has_jsonl_extension(input);
    let records = read_export(input, jsonl)?;

    let mut summary = LoadSummary::default();
    let mut places = Vec::new();
    for record in &records {
        match normalise_record(record) {
            Some(place) => places.push(place),
            None => summary.skipped += 1,
        }
    }
    if summary.skipped > 0 {
        warn!(
            "skipped {} of {} records missing required fields or coordinates",
            summary.skipped,
            records.len()
        );
    }

    if options.dry_run {
        info!("dry run: {} records ready to load", places.len());
        summary.loaded = places.len();
        return Ok(summary);
    }

    initialise_schema(connection)?;
    for batch in places.chunks(options.batch_size.max(1)) {
        upsert_batch(connection, batch)?;
        summary.loaded += batch.len();
        info!("loaded {}/{} records", summary.loaded, places.len());
    }

    Ok(summary)
}

/// Convenience helper to load an export into a database file on disk.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use placemap_data::{LoadOptions, load_export_to_path};
///
/// # fn main() -> Result<(), placemap_data::LoadError> {
/// let summary = load_export_to_path(
///     Path::new("places.db"),
///     Path::new("data/build/places.json"),
///     &LoadOptions::default(),
/// )?;
/// println!("loaded {} records", summary.loaded);
/// # Ok(())
/// # }
/// ```
pub fn load_export_to_path<P, Q>(
    database_path: P,
    input: Q,
    options: &LoadOptions,
) -> Result<LoadSummary, LoadError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mut connection =
        Connection::open(database_path.as_ref()).map_err(|source| LoadError::Open {
            path: database_path.as_ref().to_path_buf(),
            source,
        })?;
    load_export(&mut connection, input.as_ref(), options)
}

fn has_jsonl_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("jsonl"))
}

fn read_export(path: &Path, jsonl: bool) -> Result<Vec<Value>, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if jsonl {
        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: Value =
                serde_json::from_str(trimmed).map_err(|source| LoadError::ParseLine {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                })?;
            if !record.is_object() {
                return Err(LoadError::NotAnObject {
                    path: path.to_path_buf(),
                    line: index + 1,
                });
            }
            records.push(record);
        }
        return Ok(records);
    }

    let parsed: Value = serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match parsed {
        Value::Array(records) => Ok(records),
        _ => Err(LoadError::NotAnArray {
            path: path.to_path_buf(),
        }),
    }
}

fn upsert_batch(connection: &mut Connection, places: &[Place]) -> Result<(), LoadError> {
    let transaction = connection
        .transaction()
        .map_err(|source| LoadError::Sqlite {
            operation: "begin load transaction",
            source,
        })?;

    {
        let mut upsert =
            transaction
                .prepare_cached(UPSERT_SQL)
                .map_err(|source| LoadError::Sqlite {
                    operation: "prepare place upsert",
                    source,
                })?;
        for place in places {
            let properties = serde_json::to_string(&place.properties).map_err(|source| {
                LoadError::EncodeProperties {
                    id: place.id.clone(),
                    source,
                }
            })?;
            upsert
                .execute(rusqlite::params![
                    place.id,
                    place.name,
                    place.address,
                    place.category,
                    place.city,
                    place.location.x,
                    place.location.y,
                    properties,
                ])
                .map_err(|source| LoadError::Sqlite {
                    operation: "upsert place",
                    source,
                })?;
        }
    }

    transaction.commit().map_err(|source| LoadError::Sqlite {
        operation: "commit load transaction",
        source,
    })
}
