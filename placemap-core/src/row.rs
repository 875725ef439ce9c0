//! Normalisation of raw store rows into the public shapes.

use geo::Coord;
use rusqlite::Row;
use serde_json::Map;

use crate::error::PlacesError;
use crate::place::{Place, Properties};

/// Map one listing row onto a [`Place`].
///
/// Scalar columns pass through verbatim; the stored point is reassembled
/// from its decomposed `lng`/`lat` columns; the properties blob must be a
/// JSON object (SQL NULL and JSON null normalise to an empty mapping, any
/// other malformed payload is a data-integrity failure).
pub(crate) fn place_from_row(row: &Row<'_>) -> Result<Place, PlacesError> {
    let id: String = row.get("id")?;
    let raw_properties: Option<String> = row.get("properties")?;
    let properties = parse_properties(&id, raw_properties.as_deref())?;
    Ok(Place {
        name: row.get("name")?,
        address: row.get("address")?,
        category: row.get("category")?,
        city: row.get("city")?,
        location: Coord {
            x: row.get("lng")?,
            y: row.get("lat")?,
        },
        id,
        properties,
    })
}

fn parse_properties(id: &str, raw: Option<&str>) -> Result<Properties, PlacesError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    let parsed: Option<Properties> =
        serde_json::from_str(raw).map_err(|source| PlacesError::InvalidProperties {
            id: id.to_owned(),
            source,
        })?;
    Ok(parsed.unwrap_or_default())
}

/// Read a grouped count, defending against a NULL the store should never
/// produce under correct grouping.
pub(crate) fn count_from_row(row: &Row<'_>, index: usize) -> Result<u64, PlacesError> {
    let count: Option<i64> = row.get(index)?;
    Ok(count
        .and_then(|value| u64::try_from(value).ok())
        .unwrap_or(0))
}
