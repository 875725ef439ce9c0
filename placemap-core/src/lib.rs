//! Read-only query core for geo-tagged place records.
//!
//! Filter criteria translate into an ordered list of independent SQL
//! predicates, the predicates assemble onto one of three base projections
//! (place listing, city counts, district counts), the statement executes
//! over SQLite, and raw rows normalise into the public response shapes.
//! The [`PlaceQueryService`] is the contract consumed by transport layers;
//! every failure carries an [`ErrorKind`] so callers can map kinds to
//! status codes without matching variants.

#![forbid(unsafe_code)]

mod error;
mod filter;
mod place;
mod query;
mod row;
mod service;

pub use error::{ErrorKind, PlacesError};
pub use filter::{BoundingBox, PlaceFilter, Presence};
pub use place::{Place, Properties};
pub use service::{
    CityAggregate, CityList, DistrictAggregate, DistrictList, PlaceList, PlaceQueryService,
};
