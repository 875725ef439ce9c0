//! End-to-end tests loading an export and querying it through the service.
//!
//! These exercise the full pipeline: the export written by the build
//! pipeline is loaded into a fresh database file and the resulting rows are
//! read back through `placemap-core`'s query operations.

use std::{fs, path::PathBuf};

use placemap_core::{PlaceFilter, PlaceQueryService, Presence};
use placemap_data::{LoadOptions, LoadSummary, load_export_to_path};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;

struct LoadedDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl LoadedDatabase {
    fn service(&self) -> PlaceQueryService {
        PlaceQueryService::new(&self.path)
    }
}

fn export_records() -> Value {
    json!([
        {
            "id": "park-1",
            "name": "Daan Forest Park",
            "address": "No. 1, Sec. 2, Xinsheng S Rd",
            "category": "park",
            "city": "taipei",
            "location": {"lat": 25.03, "lng": 121.54},
            "properties": {"district": "大安區", "city_name": "台北", "parking_count": 3},
        },
        {
            "id": "toilet-1",
            "name": "Riverside Restroom",
            "category": "toilet",
            "city": "taipei",
            "location": {"lat": 25.07, "lng": 121.51},
            "properties": {"district": "中正區", "diaper_table_count": 2},
        },
        {
            "id": "toilet-2",
            "name": "Harbour Restroom",
            "category": "toilet",
            "city": "keelung",
            "location": {"lat": 25.13, "lng": 121.74},
            "properties": {},
        },
        {
            "id": "park-stale",
            "name": "Closed Park",
            "category": "park",
            "city": "taipei",
            "location": {"lat": 25.05, "lng": 121.53},
            "properties": {"district": "大安區", "data_status": "outdated"},
        },
        {
            "id": "no-coords",
            "name": "Unmappable",
            "category": "park",
            "city": "taipei",
        },
    ])
}

fn load_records(records: &Value) -> (LoadedDatabase, LoadSummary) {
    let dir = TempDir::new().expect("create temp dir");
    let export = dir.path().join("places.json");
    fs::write(&export, records.to_string()).expect("write export");
    let path = dir.path().join("places.db");
    let summary = load_export_to_path(&path, &export, &LoadOptions::default())
        .expect("load export");
    (LoadedDatabase { _dir: dir, path }, summary)
}

#[fixture]
fn loaded() -> (LoadedDatabase, LoadSummary) {
    load_records(&export_records())
}

#[rstest]
fn load_reports_loaded_and_skipped_counts(loaded: (LoadedDatabase, LoadSummary)) {
    let (_db, summary) = loaded;
    assert_eq!(
        summary,
        LoadSummary {
            loaded: 4,
            skipped: 1,
        }
    );
}

#[rstest]
fn listing_excludes_dropped_and_outdated_records(loaded: (LoadedDatabase, LoadSummary)) {
    let (db, _) = loaded;
    let listing = db
        .service()
        .list_places(&PlaceFilter::new())
        .expect("list places");
    assert_eq!(listing.count, 3);
    assert!(listing.items.iter().all(|place| place.id != "park-stale"));
    assert!(listing.items.iter().all(|place| place.id != "no-coords"));
}

#[rstest]
fn amenity_filters_read_the_loaded_blobs(loaded: (LoadedDatabase, LoadSummary)) {
    let (db, _) = loaded;
    let service = db.service();

    let with_diaper = service
        .list_places(&PlaceFilter::new().with_diaper_table(Presence::Present))
        .expect("list places");
    let diaper_ids: Vec<&str> = with_diaper
        .items
        .iter()
        .map(|place| place.id.as_str())
        .collect();
    assert_eq!(diaper_ids, vec!["toilet-1"]);

    let with_parking = service
        .list_places(&PlaceFilter::new().with_parking(Presence::Present))
        .expect("list places");
    let parking_ids: Vec<&str> = with_parking
        .items
        .iter()
        .map(|place| place.id.as_str())
        .collect();
    assert_eq!(parking_ids, vec!["park-1"]);
}

#[rstest]
fn city_and_district_aggregates_follow_the_loaded_rows(loaded: (LoadedDatabase, LoadSummary)) {
    let (db, _) = loaded;
    let service = db.service();

    let cities = service.list_cities(&[], false).expect("list cities");
    let codes: Vec<(&str, &str, u64)> = cities
        .cities
        .iter()
        .map(|city| (city.code.as_str(), city.name.as_str(), city.count))
        .collect();
    assert_eq!(codes, vec![("keelung", "keelung", 1), ("taipei", "台北", 2)]);

    let districts = service
        .list_districts("taipei", &[], false)
        .expect("list districts");
    let names: Vec<(&str, u64)> = districts
        .districts
        .iter()
        .map(|district| (district.name.as_str(), district.count))
        .collect();
    assert_eq!(names, vec![("中正區", 1), ("大安區", 1)]);
}

#[rstest]
fn reloading_the_same_export_is_idempotent(loaded: (LoadedDatabase, LoadSummary)) {
    let (db, _) = loaded;
    let export = db.path.parent().expect("export directory").join("places.json");
    let summary = load_export_to_path(&db.path, &export, &LoadOptions::default())
        .expect("reload export");
    assert_eq!(summary.loaded, 4);

    let listing = db
        .service()
        .list_places(&PlaceFilter::new().with_outdated())
        .expect("list places");
    assert_eq!(listing.count, 4);
}
