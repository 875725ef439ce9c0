//! The place query service: the read contract consumed by transport layers.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params_from_iter};
use serde::Serialize;

use crate::error::PlacesError;
use crate::filter::PlaceFilter;
use crate::place::Place;
use crate::query::{self, PredicateSet};
use crate::row;

/// Filtered place listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceList {
    /// Matching places, in store order.
    pub items: Vec<Place>,
    /// Number of items returned; there is no pagination.
    pub count: usize,
}

/// Per-city row count with a resolved display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityAggregate {
    /// City code.
    pub code: String,
    /// Display name, falling back to the code when no row carries one.
    pub name: String,
    /// Number of matching rows.
    pub count: u64,
}

/// City aggregates for every city with matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityList {
    /// Aggregates ordered by city code.
    pub cities: Vec<CityAggregate>,
}

/// Per-district row count within one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictAggregate {
    /// District name from the attribute blob.
    pub name: String,
    /// Number of matching rows.
    pub count: u64,
}

/// District aggregates for one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictList {
    /// The city code the breakdown was requested for.
    pub city: String,
    /// Aggregates ordered by district name.
    pub districts: Vec<DistrictAggregate>,
}

/// Read-only query operations over the places database.
///
/// Each operation validates its input, builds predicates, opens one
/// read-only connection scoped to the call, executes, and normalises the
/// rows. Filter validation happens before any connection is opened, and the
/// connection is released on every exit path.
///
/// # Examples
/// ```no_run
/// use placemap_core::{PlaceFilter, PlaceQueryService};
///
/// # fn main() -> Result<(), placemap_core::PlacesError> {
/// let service = PlaceQueryService::new("places.db");
/// let listing = service.list_places(&PlaceFilter::new().with_city("taipei"))?;
/// println!("{} places", listing.count);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PlaceQueryService {
    database_path: PathBuf,
}

impl PlaceQueryService {
    /// Create a service reading from the database at `database_path`.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(database_path: P) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    /// Location of the backing database.
    #[must_use]
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// List every place matching `filter`, with the total count.
    pub fn list_places(&self, filter: &PlaceFilter) -> Result<PlaceList, PlacesError> {
        let predicates = query::build_predicates(filter)?;
        let connection = self.connect()?;
        let statement_text = query::select_places(&predicates);
        let mut statement = connection.prepare(&statement_text)?;
        let mut rows = statement.query(params_from_iter(predicates.params()))?;

        let mut items = Vec::new();
        while let Some(raw) = rows.next()? {
            items.push(row::place_from_row(raw)?);
        }

        Ok(PlaceList {
            count: items.len(),
            items,
        })
    }

    /// Count matching rows per city and resolve a display name per group.
    ///
    /// The name comes from any row with that city code whose blob carries a
    /// non-null `city_name`; the code itself is the fallback. Name lookups
    /// run after the grouped query, one per group, on the same connection.
    pub fn list_cities(
        &self,
        categories: &[String],
        include_outdated: bool,
    ) -> Result<CityList, PlacesError> {
        let filter = PlaceFilter {
            categories: categories.to_vec(),
            include_outdated,
            ..PlaceFilter::default()
        };
        let predicates = query::build_predicates(&filter)?;
        let connection = self.connect()?;
        let grouped = grouped_counts(&connection, &query::count_by_city(&predicates), &predicates)?;

        let mut lookup = connection.prepare(query::CITY_NAME_LOOKUP)?;
        let mut cities = Vec::with_capacity(grouped.len());
        for (code, count) in grouped {
            let name: Option<String> = lookup
                .query_row([code.as_str()], |raw| raw.get(0))
                .optional()?;
            cities.push(CityAggregate {
                name: name.unwrap_or_else(|| code.clone()),
                code,
                count,
            });
        }
        Ok(CityList { cities })
    }

    /// Count matching rows per district within `city`.
    ///
    /// An empty or missing city code is a validation error, not an empty
    /// result. Rows whose blob has no district are left out of the
    /// breakdown; they still count toward the city total in
    /// [`Self::list_cities`].
    pub fn list_districts(
        &self,
        city: &str,
        categories: &[String],
        include_outdated: bool,
    ) -> Result<DistrictList, PlacesError> {
        if city.is_empty() {
            return Err(PlacesError::MissingCity);
        }
        let filter = PlaceFilter {
            categories: categories.to_vec(),
            include_outdated,
            ..PlaceFilter::default()
        };
        let predicates = query::district_predicates(city, &filter)?;
        let connection = self.connect()?;
        let grouped = grouped_counts(
            &connection,
            &query::count_by_district(&predicates),
            &predicates,
        )?;
        let districts = grouped
            .into_iter()
            .map(|(name, count)| DistrictAggregate { name, count })
            .collect();
        Ok(DistrictList {
            city: city.to_owned(),
            districts,
        })
    }

    fn connect(&self) -> Result<Connection, PlacesError> {
        if !self.database_path.exists() {
            return Err(PlacesError::MissingDatabase {
                path: self.database_path.clone(),
            });
        }
        Ok(Connection::open_with_flags(
            &self.database_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY,
        )?)
    }
}

fn grouped_counts(
    connection: &Connection,
    statement_text: &str,
    predicates: &PredicateSet,
) -> Result<Vec<(String, u64)>, PlacesError> {
    let mut statement = connection.prepare(statement_text)?;
    let mut rows = statement.query(params_from_iter(predicates.params()))?;
    let mut grouped = Vec::new();
    while let Some(raw) = rows.next()? {
        let key: String = raw.get(0)?;
        grouped.push((key, row::count_from_row(raw, 1)?));
    }
    Ok(grouped)
}
