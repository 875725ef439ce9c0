use geo::Coord;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};

/// Open attribute mapping attached to every place.
///
/// Keys are free-form; well-known entries include `data_status`,
/// `diaper_table_count`, the parking fields, `district`, and `city_name`.
/// Values round-trip as JSON without any schema enforcement.
pub type Properties = Map<String, Value>;

/// A geo-tagged place record.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. Every
/// persisted place has a location; rows without coordinates are dropped at
/// load time, never filtered at query time.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use placemap_core::Place;
/// use serde_json::Map;
///
/// let place = Place {
///     id: "toilet-001".into(),
///     name: "Daan Park Restroom".into(),
///     address: None,
///     category: "toilet".into(),
///     city: "taipei".into(),
///     location: Coord { x: 121.54, y: 25.03 },
///     properties: Map::new(),
/// };
///
/// let encoded = serde_json::to_value(&place).unwrap();
/// assert_eq!(encoded["lng"], 121.54);
/// assert_eq!(encoded["lat"], 25.03);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Street address, when known.
    pub address: Option<String>,
    /// Category code from the open vocabulary (park, toilet, ...).
    pub category: String,
    /// City code the place belongs to.
    pub city: String,
    /// Geospatial position.
    pub location: Coord<f64>,
    /// Open attribute mapping.
    pub properties: Properties,
}

// The external shape decomposes the point into `lat`/`lng` fields; the
// field order matches the established API payload.
impl Serialize for Place {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("Place", 8)?;
        row.serialize_field("id", &self.id)?;
        row.serialize_field("name", &self.name)?;
        row.serialize_field("address", &self.address)?;
        row.serialize_field("lat", &self.location.y)?;
        row.serialize_field("lng", &self.location.x)?;
        row.serialize_field("category", &self.category)?;
        row.serialize_field("city", &self.city)?;
        row.serialize_field("properties", &self.properties)?;
        row.end()
    }
}
