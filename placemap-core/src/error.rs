//! Error taxonomy for place queries.
//!
//! Every failure maps onto one [`ErrorKind`], so a transport layer can pick
//! a distinct status code per kind without matching individual variants.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating filter criteria or executing queries.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// The bounding box string was not four comma-separated numbers.
    #[error("invalid bbox '{raw}': expected minLng,minLat,maxLng,maxLat")]
    InvalidBbox {
        /// The raw value supplied by the caller.
        raw: String,
    },
    /// District listing was requested without a city code.
    #[error("city is required for district listing")]
    MissingCity,
    /// The places database does not exist at the configured path.
    #[error("places database not found at {path:?}")]
    MissingDatabase {
        /// Location the service expected the database at.
        path: PathBuf,
    },
    /// A persisted properties blob was not a JSON object.
    #[error("failed to parse properties for place {id}")]
    InvalidProperties {
        /// Identifier of the offending row.
        id: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The underlying store failed while executing a query.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Broad failure classification consumed at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied input was rejected; retrying unchanged cannot help.
    Validation,
    /// The underlying data source was absent at operation time.
    MissingData,
    /// Persisted state is corrupt.
    DataIntegrity,
    /// The store was unreachable or the engine reported a failure.
    Io,
    /// Anything not classified above; surfaced, never dropped.
    Internal,
}

impl PlacesError {
    /// Classify this error for the transport boundary.
    ///
    /// A corrupt properties blob is data-integrity on every path: rows that
    /// reach normalisation raise [`PlacesError::InvalidProperties`], while a
    /// blob hit by a `json_extract` predicate fails inside SQLite, which
    /// reports it as a generic runtime failure identified only by its
    /// `malformed JSON` message.
    ///
    /// # Examples
    /// ```
    /// use placemap_core::{ErrorKind, PlacesError};
    ///
    /// let error = PlacesError::InvalidBbox { raw: "1,2,3".into() };
    /// assert_eq!(error.kind(), ErrorKind::Validation);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBbox { .. } | Self::MissingCity => ErrorKind::Validation,
            Self::MissingDatabase { .. } => ErrorKind::MissingData,
            Self::InvalidProperties { .. } => ErrorKind::DataIntegrity,
            Self::Database(rusqlite::Error::SqliteFailure(_, Some(message)))
                if message.contains("malformed JSON") =>
            {
                ErrorKind::DataIntegrity
            }
            Self::Database(rusqlite::Error::SqliteFailure(..)) => ErrorKind::Io,
            Self::Database(_) => ErrorKind::Internal,
        }
    }
}
