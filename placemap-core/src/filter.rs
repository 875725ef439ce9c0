//! Composable filter criteria for place queries.

use std::str::FromStr;

use crate::error::PlacesError;

/// Tri-state amenity requirement carried by the wire flags `"1"` / `"0"`.
///
/// The unset state is modelled as `Option<Presence>`; [`Presence::from_flag`]
/// degrades unrecognised values to unset rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// The amenity must be present.
    Present,
    /// The amenity must be absent.
    Absent,
}

impl Presence {
    /// Parse a wire flag; anything other than `"1"` or `"0"` means unset.
    ///
    /// # Examples
    /// ```
    /// use placemap_core::Presence;
    ///
    /// assert_eq!(Presence::from_flag("1"), Some(Presence::Present));
    /// assert_eq!(Presence::from_flag("0"), Some(Presence::Absent));
    /// assert_eq!(Presence::from_flag("yes"), None);
    /// ```
    #[must_use]
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "1" => Some(Self::Present),
            "0" => Some(Self::Absent),
            _ => None,
        }
    }
}

/// Axis-aligned WGS84 bounding box parsed from `minLng,minLat,maxLng,maxLat`.
///
/// Corners are kept exactly as supplied. A box whose minimum exceeds its
/// maximum matches nothing; it is neither re-ordered nor rejected.
///
/// # Examples
/// ```
/// use placemap_core::BoundingBox;
///
/// let bbox: BoundingBox = "121.50,25.02,121.58,25.10".parse().unwrap();
/// assert_eq!(bbox.min_lng, 121.50);
/// assert_eq!(bbox.max_lat, 25.10);
/// assert!("1,2,3".parse::<BoundingBox>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lng: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lng: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl FromStr for BoundingBox {
    type Err = PlacesError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || PlacesError::InvalidBbox {
            raw: raw.to_owned(),
        };
        let parts: Vec<&str> = raw.split(',').collect();
        let [min_lng, min_lat, max_lng, max_lat] = parts.as_slice() else {
            return Err(invalid());
        };
        Ok(Self {
            min_lng: min_lng.trim().parse().map_err(|_| invalid())?,
            min_lat: min_lat.trim().parse().map_err(|_| invalid())?,
            max_lng: max_lng.trim().parse().map_err(|_| invalid())?,
            max_lat: max_lat.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Criteria for the place listing operation.
///
/// Every criterion is optional and contributes nothing when absent; rows
/// marked outdated are excluded unless `include_outdated` is set.
///
/// # Examples
/// ```
/// use placemap_core::{PlaceFilter, Presence};
///
/// let filter = PlaceFilter::new()
///     .with_categories(["park", "toilet"])
///     .with_city("taipei")
///     .with_parking(Presence::Present);
/// assert_eq!(filter.categories.len(), 2);
/// assert!(!filter.include_outdated);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceFilter {
    /// Categories to match; empty means no category filter.
    pub categories: Vec<String>,
    /// Exact city code to match.
    pub city: Option<String>,
    /// Raw bounding box string, validated at query-build time.
    pub bbox: Option<String>,
    /// Diaper-table requirement.
    pub diaper_table: Option<Presence>,
    /// Parking requirement, across every historical field spelling.
    pub parking: Option<Presence>,
    /// Include rows whose `data_status` marks them outdated.
    pub include_outdated: bool,
}

impl PlaceFilter {
    /// Criteria that match every fresh row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict matches to the given categories.
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict matches to one city code.
    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Restrict matches to a raw `minLng,minLat,maxLng,maxLat` box.
    #[must_use]
    pub fn with_bbox(mut self, bbox: impl Into<String>) -> Self {
        self.bbox = Some(bbox.into());
        self
    }

    /// Require a diaper table to be present or absent.
    #[must_use]
    pub fn with_diaper_table(mut self, requirement: Presence) -> Self {
        self.diaper_table = Some(requirement);
        self
    }

    /// Require parking to be present or absent.
    #[must_use]
    pub fn with_parking(mut self, requirement: Presence) -> Self {
        self.parking = Some(requirement);
        self
    }

    /// Include rows marked outdated.
    #[must_use]
    pub fn with_outdated(mut self) -> Self {
        self.include_outdated = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_a_four_component_box() {
        let bbox: BoundingBox = "121.50,25.02,121.58,25.10"
            .parse()
            .expect("box should parse");
        assert_eq!(bbox.min_lng, 121.50);
        assert_eq!(bbox.min_lat, 25.02);
        assert_eq!(bbox.max_lng, 121.58);
        assert_eq!(bbox.max_lat, 25.10);
    }

    #[rstest]
    fn tolerates_whitespace_around_components() {
        let bbox: BoundingBox = " -1 , -2 , 3 , 4 ".parse().expect("box should parse");
        assert_eq!(bbox.min_lng, -1.0);
        assert_eq!(bbox.max_lat, 4.0);
    }

    #[rstest]
    #[case("1,2,3")]
    #[case("1,2,3,4,5")]
    #[case("a,b,c,d")]
    #[case("1,2,3,x")]
    #[case("")]
    fn rejects_malformed_boxes(#[case] raw: &str) {
        let error = raw
            .parse::<BoundingBox>()
            .expect_err("malformed box should fail");
        assert!(matches!(
            error,
            PlacesError::InvalidBbox { raw: reported } if reported == raw
        ));
    }

    #[rstest]
    #[case("1", Some(Presence::Present))]
    #[case("0", Some(Presence::Absent))]
    #[case("", None)]
    #[case("true", None)]
    #[case("2", None)]
    fn flags_map_to_tri_state(#[case] flag: &str, #[case] expected: Option<Presence>) {
        assert_eq!(Presence::from_flag(flag), expected);
    }

    #[rstest]
    fn builder_accumulates_criteria() {
        let filter = PlaceFilter::new()
            .with_categories(["park"])
            .with_city("taipei")
            .with_bbox("121.50,25.02,121.58,25.10")
            .with_diaper_table(Presence::Absent)
            .with_outdated();
        assert_eq!(filter.categories, vec!["park".to_owned()]);
        assert_eq!(filter.city.as_deref(), Some("taipei"));
        assert_eq!(filter.diaper_table, Some(Presence::Absent));
        assert!(filter.parking.is_none());
        assert!(filter.include_outdated);
    }
}
