use super::*;
use std::sync::Arc;

use crate::payload::{CsvTableCodec, JsonImageCodec, JsonMappingCodec, Payload};
use crate::registry::TypeContract;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn table_contract() -> TypeContract {
    TypeContract::new("Localizations", Arc::new(CsvTableCodec))
}

fn mapping_contract() -> TypeContract {
    TypeContract::describing("LocMetadata", "Localizations", Arc::new(JsonMappingCodec))
}

#[test]
fn test_read_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "HeLa_1.locResults.dat", "x,y\n210.4,90.2\n211.0,91.7\n");

    let payload = read_payload(&path, &table_contract()).unwrap();
    let Payload::Table(table) = payload else {
        panic!("expected a table payload");
    };
    assert_eq!(table.columns, vec!["x", "y"]);
    assert_eq!(table.rows, vec![vec![210.4, 90.2], vec![211.0, 91.7]]);
}

#[test]
fn test_read_table_rejects_non_numeric() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "bad.dat", "x,y\n1.0,apple\n");

    let err = read_payload(&path, &table_contract()).unwrap_err();
    assert!(matches!(err, ReadError::Csv { .. }));
}

#[test]
fn test_read_table_rejects_ragged_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "ragged.dat", "x,y\n1.0\n");

    let err = read_payload(&path, &table_contract()).unwrap_err();
    assert!(matches!(err, ReadError::Csv { .. }));
}

#[test]
fn test_read_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "HeLa_1.locMetadata.json",
        r#"{"exposure_ms": 10, "laser": {"line": "A647"}}"#,
    );

    let payload = read_payload(&path, &mapping_contract()).unwrap();
    let Payload::Mapping(mapping) = payload else {
        panic!("expected a mapping payload");
    };
    assert_eq!(mapping.get("exposure_ms"), Some(&serde_json::json!(10)));
}

#[test]
fn test_read_mapping_rejects_non_object() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "list.json", "[1, 2, 3]");

    let err = read_payload(&path, &mapping_contract()).unwrap_err();
    assert!(matches!(err, ReadError::Json { .. }));
}

#[test]
fn test_read_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_payload(&dir.path().join("absent.dat"), &table_contract()).unwrap_err();
    // csv::Reader::from_path surfaces the open failure.
    assert!(matches!(err, ReadError::Csv { .. }));
}

#[test]
fn test_image_contracts_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "image.tif", "");
    let contract = TypeContract::new("WidefieldImage", Arc::new(JsonImageCodec));

    let err = read_payload(&path, &contract).unwrap_err();
    assert!(matches!(
        err,
        ReadError::Unsupported {
            kind: crate::payload::PayloadKind::Image,
            ..
        }
    ));
}
