//! Facade crate for the placemap query engine.
//!
//! Re-exports the public API of `placemap-core`: the place query service,
//! the composable filter criteria, the response shapes, and the error
//! taxonomy consumed by transport layers.

#![forbid(unsafe_code)]

pub use placemap_core::{
    BoundingBox, CityAggregate, CityList, DistrictAggregate, DistrictList, ErrorKind, Place,
    PlaceFilter, PlaceList, PlaceQueryService, PlacesError, Presence, Properties,
};
