//! Loading and schema management for the places database.
//!
//! Responsibilities:
//! - Materialise the `places` schema consumed by `placemap-core`.
//! - Normalise raw export records and upsert them keyed on `id`.
//! - Provide the `places-load` command-line entrypoint.
//!
//! Boundaries:
//! - Do not encode query rules (live in `placemap-core`).
//! - The query core never writes; all mutation happens here.

#![forbid(unsafe_code)]

mod loader;
mod schema;

pub use loader::{
    LoadError, LoadOptions, LoadSummary, load_export, load_export_to_path, normalise_record,
};
pub use schema::{PlacesSchemaError, SCHEMA_VERSION, initialise_schema};
