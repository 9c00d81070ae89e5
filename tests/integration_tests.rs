// Integration tests for Nearby Subs

use nearby_subs::core::{export_file_name, find_nearby, ranked_rows, to_csv_string, SchemaRules};
use nearby_subs::models::{LookupField, Role};
use nearby_subs::services::{Dataset, LoadError, SourceError, Workbook};
use std::fs;

const SUBS_CSV: &str = "\
Sub,Sub Name,Lattitude,Longitude,Out of Town,City/State
S01,Fairfax,38.8462,-77.3064,,\"Fairfax, VA\"
S02,Reston,38.9586,-77.3570,,
S03,Herndon,38.9696,-77.3861,Y,
S04,Baltimore,39.2904,-76.6122,Y,
S05,Richmond,37.5407,-77.4360,Y,
S06,Broken,not-a-number,-77.0,,
S07,fairfax,38.8462,-77.3064,,
";

fn load_dataset(sheet_name: &str) -> Dataset {
    let workbook = Workbook::from_csv_reader(sheet_name, SUBS_CSV.as_bytes()).unwrap();
    Dataset::from_workbook(&workbook, "test", None, &SchemaRules::default()).unwrap()
}

#[test]
fn test_integration_end_to_end_query() {
    let dataset = load_dataset("Query2");

    // Broken coordinate row dropped, duplicate name kept
    assert_eq!(dataset.records.len(), 6);

    let result = find_nearby(&dataset.records, "FAIRFAX", 15.0, LookupField::Identifier);
    let center = result.center.expect("Fairfax should resolve");
    assert_eq!(center.record.code, "S01");
    assert_eq!(center.record.location_label, "Fairfax, VA");
    assert_eq!(center.role, Role::Center);

    let names: Vec<&str> = result
        .neighbors
        .iter()
        .map(|e| e.record.identifier.as_str())
        .collect();
    // Coincident duplicate first, then Reston (~8mi), then Herndon (~9mi)
    assert_eq!(names, vec!["fairfax", "Reston", "Herndon"]);
    assert_eq!(result.neighbors[0].distance_miles, 0.0);
    assert_eq!(result.neighbors[2].record.out_of_town, "Y");
}

#[test]
fn test_integration_lookup_by_code() {
    let dataset = load_dataset("upload");
    let result = find_nearby(&dataset.records, "s04", 50.0, LookupField::Code);
    assert_eq!(result.center.unwrap().record.identifier, "Baltimore");
    // Northern Virginia is ~45-50 miles away; Richmond is not
    assert!(result
        .neighbors
        .iter()
        .all(|e| e.record.identifier != "Richmond"));
}

#[test]
fn test_integration_not_found_exports_header_only() {
    let dataset = load_dataset("upload");
    let result = find_nearby(&dataset.records, "Nowhere", 50.0, LookupField::Identifier);
    assert!(result.center.is_none());

    let csv = to_csv_string(&ranked_rows(&result)).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn test_integration_export_rows() {
    let dataset = load_dataset("upload");
    let result = find_nearby(&dataset.records, "Reston", 5.0, LookupField::Identifier);
    let csv = to_csv_string(&ranked_rows(&result)).unwrap();

    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Sub Name,Sub,OT,City/State,Distance (mi),Lattitude,Longitude"
    );
    let herndon = lines.next().unwrap();
    assert!(herndon.starts_with("Herndon,S03,Y,,"), "got {}", herndon);
    assert!(herndon.ends_with(",38.9696,-77.3861"));
    assert!(lines.next().is_none());

    assert_eq!(export_file_name("Reston", 5.0), "nearby_Reston_5mi.csv");
}

#[test]
fn test_integration_directory_workbook_and_sheet_choice() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Archive.csv"), "Name,Lat,Lon\nOld,1,1\n").unwrap();
    fs::write(dir.path().join("Query2.csv"), SUBS_CSV).unwrap();

    let dataset = Dataset::from_path(dir.path(), None, &SchemaRules::default()).unwrap();
    assert_eq!(dataset.sheet, "Query2");
    assert_eq!(dataset.sheets, vec!["Archive", "Query2"]);

    let archive = Dataset::from_path(dir.path(), Some("Archive"), &SchemaRules::default()).unwrap();
    assert_eq!(archive.records.len(), 1);

    let err = Dataset::from_path(dir.path(), Some("Nope"), &SchemaRules::default()).unwrap_err();
    assert!(matches!(err, LoadError::Source(SourceError::SheetNotFound { .. })));
}

#[test]
fn test_integration_lone_sub_column_is_the_name() {
    let csv = "Sub,Lat,Long\nAlpha,0,0\nBravo,0,0.2\n";
    let workbook = Workbook::from_csv_reader("sheet", csv.as_bytes()).unwrap();

    for rules in [SchemaRules::default(), SchemaRules::sub_as_identifier()] {
        let dataset = Dataset::from_workbook(&workbook, "test", None, &rules).unwrap();
        let result = find_nearby(&dataset.records, "alpha", 20.0, LookupField::Identifier);
        assert_eq!(result.neighbors.len(), 1);
        assert_eq!(result.neighbors[0].record.identifier, "Bravo");
        assert_eq!(result.neighbors[0].record.code, "");
    }
}

#[test]
fn test_integration_sub_policy_with_separate_name_column() {
    let workbook = Workbook::from_csv_reader("sheet", SUBS_CSV.as_bytes()).unwrap();

    let as_code = Dataset::from_workbook(&workbook, "test", None, &SchemaRules::default()).unwrap();
    assert_eq!(as_code.records[0].identifier, "Fairfax");
    assert_eq!(as_code.records[0].code, "S01");

    let as_identifier =
        Dataset::from_workbook(&workbook, "test", None, &SchemaRules::sub_as_identifier()).unwrap();
    assert_eq!(as_identifier.records[0].identifier, "Fairfax");
    assert_eq!(as_identifier.records[0].code, "");
}

#[test]
fn test_integration_spreadsheet_default_sheet() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Sub_Plus_OT.xlsx");

    let dataset = Dataset::from_path(&path, None, &SchemaRules::default()).unwrap();
    assert_eq!(dataset.sheet, "Query2");
    assert_eq!(dataset.sheets, vec!["Summary", "Query2"]);
    assert_eq!(dataset.records.len(), 4);
    assert_eq!(dataset.records[0].location_label, "Fairfax, VA");
    assert_eq!(dataset.records[2].out_of_town, "Y");

    let result = find_nearby(&dataset.records, "fairfax", 15.0, LookupField::Identifier);
    let names: Vec<&str> = result
        .neighbors
        .iter()
        .map(|e| e.record.identifier.as_str())
        .collect();
    assert_eq!(names, vec!["Reston", "Herndon"]);

    let err = Dataset::from_path(&path, Some("Summary"), &SchemaRules::default()).unwrap_err();
    match err {
        LoadError::Schema(e) => assert!(e.to_string().contains(r#"["Sub Name", "Lattitude", "Longitude"]"#), "{}", e),
        other => panic!("unexpected: {:?}", other),
    }
}
