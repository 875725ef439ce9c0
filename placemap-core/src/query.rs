//! Predicate building and statement assembly for place queries.
//!
//! Filter criteria translate into an ordered list of independent boolean
//! conditions ANDed onto a `WHERE 1=1` base. Caller-supplied values only
//! ever travel as positional parameters; condition text is assembled from
//! fixed fragments. Parameter order always matches placeholder order.

use rusqlite::types::Value;

use crate::error::PlacesError;
use crate::filter::{BoundingBox, PlaceFilter, Presence};

/// Rows are fresh unless the attribute blob carries the outdated marker.
///
/// `json_extract` raises on a corrupt blob; `PlacesError::kind` classifies
/// that engine failure as data-integrity.
const FRESHNESS: &str = "(json_extract(properties, '$.data_status') IS NULL \
     OR json_extract(properties, '$.data_status') <> 'outdated')";

/// Derived diaper-table count; absent or non-numeric values cast to NULL/0.
const DIAPER_COUNT: &str =
    "CAST(json_extract(properties, '$.diaper_table_count') AS INTEGER)";

// The three historical representations of parking availability. The blob
// was never schema-enforced at ingestion, so every spelling must be
// tolerated. Each check is NULL-safe so the negated form still matches
// rows carrying none of the fields.
const PARKING_CHECKS: [&str; 3] = [
    "COALESCE(json_extract(properties, '$.has_parking') = 1, 0)",
    "COALESCE(json_extract(properties, '$.parking') = 1, 0)",
    "COALESCE(CAST(json_extract(properties, '$.parking_count') AS INTEGER), 0) > 0",
];

const DISTRICT_PRESENT: &str = "json_extract(properties, '$.district') IS NOT NULL";

/// Resolves one display name for a city code from any row carrying one.
///
/// Deliberately unscoped by the primary filters: the lookup matches the
/// established behaviour of keying on the city code alone.
pub(crate) const CITY_NAME_LOOKUP: &str = "SELECT json_extract(properties, '$.city_name') \
     FROM places WHERE city = ?1 \
     AND json_extract(properties, '$.city_name') IS NOT NULL LIMIT 1";

/// Ordered conditions plus their positional parameter values.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PredicateSet {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl PredicateSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    fn push_with<I>(&mut self, condition: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.conditions.push(condition.into());
        self.params.extend(values);
    }

    fn append(&mut self, mut other: Self) {
        self.conditions.append(&mut other.conditions);
        self.params.append(&mut other.params);
    }

    /// Conditions rendered for appending to a `WHERE 1=1` base.
    fn where_clause(&self) -> String {
        self.conditions
            .iter()
            .map(|condition| format!(" AND {condition}"))
            .collect()
    }

    /// Parameter values in placeholder order.
    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Translate filter criteria into predicates.
///
/// Rules apply independently; an absent criterion contributes no condition.
/// The freshness condition is the only implicit one and always comes first.
/// A malformed bounding box is the one criterion that fails the whole
/// operation; empty city or bbox strings degrade to no filter, matching the
/// graceful treatment of every other malformed input.
pub(crate) fn build_predicates(filter: &PlaceFilter) -> Result<PredicateSet, PlacesError> {
    let mut predicates = PredicateSet::new();

    if !filter.include_outdated {
        predicates.push(FRESHNESS);
    }

    if !filter.categories.is_empty() {
        let placeholders = vec!["?"; filter.categories.len()].join(", ");
        predicates.push_with(
            format!("category IN ({placeholders})"),
            filter
                .categories
                .iter()
                .map(|category| Value::from(category.clone())),
        );
    }

    if let Some(city) = filter.city.as_deref().filter(|city| !city.is_empty()) {
        predicates.push_with("city = ?", [Value::from(city.to_owned())]);
    }

    if let Some(raw) = filter.bbox.as_deref().filter(|raw| !raw.is_empty()) {
        let bbox: BoundingBox = raw.parse()?;
        predicates.push_with(
            "(lng BETWEEN ? AND ? AND lat BETWEEN ? AND ?)",
            [bbox.min_lng, bbox.max_lng, bbox.min_lat, bbox.max_lat].map(Value::from),
        );
    }

    if let Some(requirement) = filter.diaper_table {
        predicates.push(match requirement {
            Presence::Present => format!("{DIAPER_COUNT} > 0"),
            Presence::Absent => format!(
                "({DIAPER_COUNT} = 0 \
                 OR json_extract(properties, '$.diaper_table_count') IS NULL)"
            ),
        });
    }

    if let Some(requirement) = filter.parking {
        let available = format!("({})", PARKING_CHECKS.join(" OR "));
        predicates.push(match requirement {
            Presence::Present => available,
            Presence::Absent => format!("NOT {available}"),
        });
    }

    Ok(predicates)
}

/// Predicates for the district aggregation.
///
/// District listing is always scoped to exactly one city, so the city
/// equality leads unconditionally; rows without a district value drop out
/// last, after the freshness and category rules.
pub(crate) fn district_predicates(
    city: &str,
    filter: &PlaceFilter,
) -> Result<PredicateSet, PlacesError> {
    let mut predicates = PredicateSet::new();
    predicates.push_with("city = ?", [Value::from(city.to_owned())]);
    predicates.append(build_predicates(filter)?);
    predicates.push(DISTRICT_PRESENT);
    Ok(predicates)
}

/// Place listing projection in store-defined row order.
pub(crate) fn select_places(predicates: &PredicateSet) -> String {
    format!(
        "SELECT id, name, address, category, city, lng, lat, properties \
         FROM places WHERE 1=1{}",
        predicates.where_clause()
    )
}

/// Per-city counts, ordered by city code for stable responses.
pub(crate) fn count_by_city(predicates: &PredicateSet) -> String {
    format!(
        "SELECT city, COUNT(*) AS count FROM places WHERE 1=1{} \
         GROUP BY city ORDER BY city",
        predicates.where_clause()
    )
}

/// Per-district counts, ordered by district name for stable responses.
pub(crate) fn count_by_district(predicates: &PredicateSet) -> String {
    format!(
        "SELECT json_extract(properties, '$.district') AS district, COUNT(*) AS count \
         FROM places WHERE 1=1{} \
         GROUP BY district ORDER BY district",
        predicates.where_clause()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn empty_filter_only_excludes_outdated_rows() {
        let predicates = build_predicates(&PlaceFilter::new()).expect("build predicates");
        assert_eq!(predicates.conditions, vec![FRESHNESS.to_owned()]);
        assert!(predicates.params().is_empty());
    }

    #[rstest]
    fn include_outdated_drops_the_implicit_condition() {
        let filter = PlaceFilter::new().with_outdated();
        let predicates = build_predicates(&filter).expect("build predicates");
        assert!(predicates.conditions.is_empty());
        assert_eq!(
            select_places(&predicates),
            "SELECT id, name, address, category, city, lng, lat, properties \
             FROM places WHERE 1=1"
        );
    }

    #[rstest]
    fn freshness_leads_every_other_condition() {
        let filter = PlaceFilter::new().with_city("taipei");
        let predicates = build_predicates(&filter).expect("build predicates");
        assert_eq!(predicates.conditions.first().map(String::as_str), Some(FRESHNESS));
    }

    #[rstest]
    fn categories_expand_to_one_placeholder_each() {
        let filter = PlaceFilter::new()
            .with_outdated()
            .with_categories(["park", "toilet", "park"]);
        let predicates = build_predicates(&filter).expect("build predicates");
        assert_eq!(
            predicates.conditions,
            vec!["category IN (?, ?, ?)".to_owned()]
        );
        assert_eq!(
            predicates.params(),
            &[
                Value::from("park".to_owned()),
                Value::from("toilet".to_owned()),
                Value::from("park".to_owned()),
            ]
        );
    }

    #[rstest]
    fn bbox_parameters_follow_placeholder_order() {
        let filter = PlaceFilter::new()
            .with_outdated()
            .with_bbox("121.50,25.02,121.58,25.10");
        let predicates = build_predicates(&filter).expect("build predicates");
        assert_eq!(
            predicates.conditions,
            vec!["(lng BETWEEN ? AND ? AND lat BETWEEN ? AND ?)".to_owned()]
        );
        assert_eq!(
            predicates.params(),
            &[
                Value::from(121.50),
                Value::from(121.58),
                Value::from(25.02),
                Value::from(25.10),
            ]
        );
    }

    #[rstest]
    #[case("1,2,3")]
    #[case("a,b,c,d")]
    fn malformed_bbox_fails_the_build(#[case] raw: &str) {
        let filter = PlaceFilter::new().with_bbox(raw);
        let error = build_predicates(&filter).expect_err("malformed bbox should fail");
        assert!(matches!(
            error,
            PlacesError::InvalidBbox { raw: reported } if reported == raw
        ));
    }

    #[rstest]
    fn empty_city_and_bbox_degrade_to_no_filter() {
        let filter = PlaceFilter::new().with_outdated().with_city("").with_bbox("");
        let predicates = build_predicates(&filter).expect("build predicates");
        assert!(predicates.conditions.is_empty());
    }

    #[rstest]
    fn parking_absent_negates_the_same_disjunction() {
        let present = build_predicates(
            &PlaceFilter::new().with_outdated().with_parking(Presence::Present),
        )
        .expect("build predicates");
        let absent = build_predicates(
            &PlaceFilter::new().with_outdated().with_parking(Presence::Absent),
        )
        .expect("build predicates");
        let [inner] = present.conditions.as_slice() else {
            panic!("expected one parking condition");
        };
        assert_eq!(absent.conditions, vec![format!("NOT {inner}")]);
        assert!(inner.contains("$.has_parking"));
        assert!(inner.contains("$.parking"));
        assert!(inner.contains("$.parking_count"));
    }

    #[rstest]
    fn diaper_conditions_carry_no_parameters() {
        let filter = PlaceFilter::new()
            .with_outdated()
            .with_diaper_table(Presence::Present);
        let predicates = build_predicates(&filter).expect("build predicates");
        assert_eq!(predicates.conditions, vec![format!("{DIAPER_COUNT} > 0")]);
        assert!(predicates.params().is_empty());
    }

    #[rstest]
    fn district_predicates_lead_with_the_city() {
        let filter = PlaceFilter::new().with_categories(["park"]);
        let predicates = district_predicates("taipei", &filter).expect("build predicates");
        assert_eq!(
            predicates.conditions.first().map(String::as_str),
            Some("city = ?")
        );
        assert_eq!(
            predicates.conditions.last().map(String::as_str),
            Some(DISTRICT_PRESENT)
        );
        assert_eq!(
            predicates.params().first(),
            Some(&Value::from("taipei".to_owned()))
        );
    }

    #[rstest]
    fn assembles_the_full_listing_statement() {
        let filter = PlaceFilter::new().with_city("taipei");
        let predicates = build_predicates(&filter).expect("build predicates");
        assert_eq!(
            select_places(&predicates),
            format!(
                "SELECT id, name, address, category, city, lng, lat, properties \
                 FROM places WHERE 1=1 AND {FRESHNESS} AND city = ?"
            )
        );
    }

    #[rstest]
    fn grouped_statements_order_by_their_key() {
        let predicates = PredicateSet::new();
        assert!(count_by_city(&predicates).ends_with("GROUP BY city ORDER BY city"));
        assert!(count_by_district(&predicates).ends_with("GROUP BY district ORDER BY district"));
    }
}
