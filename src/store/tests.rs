use super::*;
use serde_json::json;
use std::time::Duration;

use crate::identifier::DatasetId;
use crate::payload::Table;
use crate::registry::{LOCALIZATIONS, LOC_METADATA, WIDEFIELD_IMAGE};

fn store() -> Datastore<MemoryBackend> {
    Datastore::new(MemoryBackend::new(), TypeRegistry::with_builtin_types())
}

fn loc_id(store: &Datastore<MemoryBackend>, prefix: &str, acq: u32) -> DatasetId {
    DatasetId::builder(prefix, acq, LOCALIZATIONS)
        .build(store.registry())
        .unwrap()
}

fn meta_id(store: &Datastore<MemoryBackend>, prefix: &str, acq: u32) -> DatasetId {
    DatasetId::builder(prefix, acq, LOC_METADATA)
        .build(store.registry())
        .unwrap()
}

fn table_payload() -> Payload {
    let mut table = Table::new(vec!["x".into(), "y".into()]);
    table.rows.push(vec![210.4, 90.2]);
    Payload::Table(table)
}

fn mapping_payload() -> Payload {
    let mut mapping = Mapping::new();
    mapping.insert("exposure_ms".to_owned(), json!(10));
    Payload::Mapping(mapping)
}

#[test]
fn test_put_get_round_trip() {
    let store = store();
    let id = loc_id(&store, "HeLaL_Control", 1);
    store.put(&id, table_payload(), None).unwrap();
    assert_eq!(store.get(&id).unwrap(), table_payload());
}

#[test]
fn test_get_missing_is_not_found() {
    let store = store();
    let id = loc_id(&store, "HeLaL_Control", 1);
    let err = store.get(&id).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert!(!store.contains(&id).unwrap());
}

#[test]
fn test_put_overwrites_last_write_wins() {
    let store = store();
    let id = loc_id(&store, "HeLa", 1);
    store.put(&id, table_payload(), None).unwrap();

    let mut second = Table::new(vec!["x".into(), "y".into()]);
    second.rows.push(vec![1.0, 2.0]);
    store.put(&id, Payload::Table(second.clone()), None).unwrap();

    assert_eq!(store.get(&id).unwrap(), Payload::Table(second));
    assert_eq!(store.query(|_| true).unwrap(), vec![id]);
}

#[test]
fn test_user_attributes_round_trip() {
    let store = store();
    let id = loc_id(&store, "HeLa", 1);

    let mut user = Mapping::new();
    user.insert("operator".to_owned(), json!("kmd"));
    store.put(&id, table_payload(), Some(user.clone())).unwrap();

    // Reserved identifier attributes are filtered out of the view.
    assert_eq!(store.attributes(&id).unwrap(), user);
}

#[test]
fn test_reserved_attribute_rejected() {
    let store = store();
    let id = loc_id(&store, "HeLa", 1);

    let mut user = Mapping::new();
    user.insert("SMLM_prefix".to_owned(), json!("spoofed"));
    let err = store.put(&id, table_payload(), Some(user)).unwrap_err();
    assert!(matches!(err, StoreError::ReservedAttribute { name } if name == "SMLM_prefix"));
}

#[test]
fn test_id_attrs_written_for_foreign_tools() {
    let store = store();
    let id = DatasetId::builder("HeLa", 3, LOCALIZATIONS)
        .channel("A647")
        .position(crate::identifier::PositionId::Two(1, 4))
        .build(store.registry())
        .unwrap();
    store.put(&id, table_payload(), None).unwrap();

    let attrs = store
        .backend()
        .read_attrs(&key::encode(&id))
        .unwrap()
        .unwrap();
    assert_eq!(attrs.get("SMLM_prefix"), Some(&json!("HeLa")));
    assert_eq!(attrs.get("SMLM_acqID"), Some(&json!(3)));
    assert_eq!(attrs.get("SMLM_datasetType"), Some(&json!("Localizations")));
    assert_eq!(attrs.get("SMLM_channelID"), Some(&json!("A647")));
    assert_eq!(attrs.get("SMLM_posID"), Some(&json!([1, 4])));
    assert_eq!(attrs.get("SMLM_Version"), Some(&json!(STORE_FORMAT_VERSION)));
}

#[test]
fn test_metadata_requires_described_dataset() {
    let store = store();
    let meta = meta_id(&store, "HeLa", 1);
    let err = store.put(&meta, mapping_payload(), None).unwrap_err();
    assert!(matches!(err, StoreError::DescribedDatasetMissing { .. }));
}

#[test]
fn test_metadata_round_trip() {
    let store = store();
    let described = loc_id(&store, "HeLa", 1);
    let meta = meta_id(&store, "HeLa", 1);

    store.put(&described, table_payload(), None).unwrap();
    store.put(&meta, mapping_payload(), None).unwrap();

    assert_eq!(store.get(&meta).unwrap(), mapping_payload());
    // The described dataset is untouched.
    assert_eq!(store.get(&described).unwrap(), table_payload());
}

#[test]
fn test_metadata_must_be_mapping() {
    let store = store();
    let described = loc_id(&store, "HeLa", 1);
    let meta = meta_id(&store, "HeLa", 1);
    store.put(&described, table_payload(), None).unwrap();

    let err = store.put(&meta, table_payload(), None).unwrap_err();
    assert!(matches!(err, StoreError::Payload(_)));
}

#[test]
fn test_metadata_overwrite_replaces_whole_mapping() {
    let store = store();
    let described = loc_id(&store, "HeLa", 1);
    let meta = meta_id(&store, "HeLa", 1);
    store.put(&described, table_payload(), None).unwrap();
    store.put(&meta, mapping_payload(), None).unwrap();

    let mut second = Mapping::new();
    second.insert("laser".to_owned(), json!("A750"));
    store.put(&meta, Payload::Mapping(second.clone()), None).unwrap();

    assert_eq!(store.get(&meta).unwrap(), Payload::Mapping(second));
}

#[test]
fn test_metadata_delete_keeps_described() {
    let store = store();
    let described = loc_id(&store, "HeLa", 1);
    let meta = meta_id(&store, "HeLa", 1);
    store.put(&described, table_payload(), None).unwrap();
    store.put(&meta, mapping_payload(), None).unwrap();

    assert!(store.delete(&meta).unwrap());
    assert!(!store.contains(&meta).unwrap());
    assert!(store.contains(&described).unwrap());

    // Deleting again reports nothing existed.
    assert!(!store.delete(&meta).unwrap());
}

#[test]
fn test_delete_plain_dataset() {
    let store = store();
    let id = loc_id(&store, "HeLa", 1);
    store.put(&id, table_payload(), None).unwrap();

    assert!(store.delete(&id).unwrap());
    assert!(!store.delete(&id).unwrap());
    assert!(store.query(|_| true).unwrap().is_empty());
}

#[test]
fn test_query_returns_canonical_order() {
    let store = store();
    let b1 = loc_id(&store, "B", 1);
    let a2 = loc_id(&store, "A", 2);
    let a10 = loc_id(&store, "A", 10);
    for id in [&b1, &a10, &a2] {
        store.put(id, table_payload(), None).unwrap();
    }

    let ids = store.query(|_| true).unwrap();
    assert_eq!(ids, vec![a2, a10, b1]);
}

#[test]
fn test_query_reconstructs_metadata_ids() {
    let store = store();
    let described = loc_id(&store, "HeLa", 1);
    let meta = meta_id(&store, "HeLa", 1);
    store.put(&described, table_payload(), None).unwrap();
    store.put(&meta, mapping_payload(), None).unwrap();

    // "LocMetadata" sorts before "Localizations" ('M' < 'a' in ASCII).
    let all = store.query(|_| true).unwrap();
    assert_eq!(all, vec![meta.clone(), described.clone()]);

    let metadata_only = store.query_type(LOC_METADATA).unwrap();
    assert_eq!(metadata_only, vec![meta]);
    assert_eq!(metadata_only[0].describes(), Some("Localizations"));
}

#[test]
fn test_query_skips_foreign_keys() {
    let store = store();
    let id = loc_id(&store, "HeLa", 1);
    store.put(&id, table_payload(), None).unwrap();

    // An entry written by some unrelated tool.
    store
        .backend()
        .write_entry("notes/readme", b"hello", &Mapping::new())
        .unwrap();

    assert_eq!(store.query(|_| true).unwrap(), vec![id]);
}

#[test]
fn test_query_type_rejects_unknown_type() {
    let store = store();
    let err = store.query_type("Chromatogram").unwrap_err();
    assert!(matches!(err, StoreError::UnknownType(_)));
}

#[test]
fn test_unknown_type_on_put() {
    let store = store();
    // Built with a richer registry than the store's own.
    let mut registry = TypeRegistry::with_builtin_types();
    registry
        .register(crate::registry::TypeContract::new(
            "DriftTracks",
            std::sync::Arc::new(crate::payload::CsvTableCodec),
        ))
        .unwrap();
    let id = DatasetId::builder("HeLa", 1, "DriftTracks")
        .build(&registry)
        .unwrap();

    let err = store.put(&id, table_payload(), None).unwrap_err();
    assert!(matches!(err, StoreError::UnknownType(_)));
}

#[test]
fn test_directory_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = Datastore::new(
        DirectoryBackend::open(dir.path()).unwrap(),
        TypeRegistry::with_builtin_types(),
    );

    let id = DatasetId::builder("HeLaL_Control", 1, LOCALIZATIONS)
        .channel("A647")
        .build(store.registry())
        .unwrap();
    store.put(&id, table_payload(), None).unwrap();

    // The physical layout mirrors the key segments.
    let entry = dir
        .path()
        .join("HeLaL_Control/HeLaL_Control_1/Localizations_ChannelA647");
    assert!(entry.join("payload.bin").is_file());
    assert!(entry.join("attrs.json").is_file());

    assert_eq!(store.get(&id).unwrap(), table_payload());
    assert_eq!(store.query(|_| true).unwrap(), vec![id.clone()]);

    // Deleting the last entry prunes the now-empty groups.
    assert!(store.delete(&id).unwrap());
    assert!(!dir.path().join("HeLaL_Control").exists());
}

#[test]
fn test_directory_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id;
    {
        let store = Datastore::new(
            DirectoryBackend::open(dir.path()).unwrap(),
            TypeRegistry::with_builtin_types(),
        );
        id = loc_id_dir(&store, "HeLa", 7);
        store.put(&id, table_payload(), None).unwrap();
    }

    // A fresh store over the same directory re-derives the index from the
    // container alone.
    let reopened = Datastore::new(
        DirectoryBackend::open(dir.path()).unwrap(),
        TypeRegistry::with_builtin_types(),
    );
    assert_eq!(reopened.query(|_| true).unwrap(), vec![id.clone()]);
    assert_eq!(reopened.get(&id).unwrap(), table_payload());
}

fn loc_id_dir(store: &Datastore<DirectoryBackend>, prefix: &str, acq: u32) -> DatasetId {
    DatasetId::builder(prefix, acq, LOCALIZATIONS)
        .build(store.registry())
        .unwrap()
}

#[test]
fn test_directory_backend_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let backend = DirectoryBackend::open(dir.path()).unwrap();
    for key in ["", "a//b", "../escape", "a/./b"] {
        let err = backend.read_payload(key).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }), "{key:?}");
    }
}

#[test]
fn test_widefield_image_round_trip() {
    let store = store();
    let id = DatasetId::builder("HeLa", 1, WIDEFIELD_IMAGE)
        .build(store.registry())
        .unwrap();
    let payload = Payload::Image(crate::payload::ImageData {
        shape: vec![2, 2],
        samples: vec![0.0, 1.0, 2.0, 3.0],
    });
    store.put(&id, payload.clone(), None).unwrap();
    assert_eq!(store.get(&id).unwrap(), payload);
}

#[test]
fn test_lock_times_out_while_writer_held() {
    let lock = lock::StoreLock::new();
    let held = lock.exclusive(Duration::from_secs(1)).unwrap();

    let err = lock.shared(Duration::from_millis(5)).unwrap_err();
    assert!(matches!(err, StorageError::LockTimeout { mode: "shared", .. }));
    let err = lock.exclusive(Duration::from_millis(5)).unwrap_err();
    assert!(matches!(
        err,
        StorageError::LockTimeout {
            mode: "exclusive",
            ..
        }
    ));

    drop(held);
    assert!(lock.shared(Duration::from_millis(5)).is_ok());
}

#[test]
fn test_readers_share_the_lock() {
    let lock = lock::StoreLock::new();
    let first = lock.shared(Duration::from_millis(5)).unwrap();
    let second = lock.shared(Duration::from_millis(5)).unwrap();
    drop(first);
    drop(second);
}

#[test]
fn test_directory_backend_excludes_other_handles() {
    let dir = tempfile::tempdir().unwrap();
    let store = Datastore::new(
        DirectoryBackend::open(dir.path()).unwrap(),
        TypeRegistry::with_builtin_types(),
    )
    .with_lock_timeout(Duration::from_millis(10));
    let id = loc_id_dir(&store, "HeLa", 1);

    // A second handle on the same container directory, as another process
    // opening the store would get.
    let other = DirectoryBackend::open(dir.path()).unwrap();
    let held = other.try_lock(true).unwrap().expect("container is idle");

    let err = store.put(&id, table_payload(), None).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Storage(StorageError::LockTimeout {
            mode: "exclusive",
            ..
        })
    ));
    let err = store.query(|_| true).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Storage(StorageError::LockTimeout { mode: "shared", .. })
    ));

    drop(held);
    store.put(&id, table_payload(), None).unwrap();
}

#[test]
fn test_directory_backend_shares_read_lock_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let store = Datastore::new(
        DirectoryBackend::open(dir.path()).unwrap(),
        TypeRegistry::with_builtin_types(),
    )
    .with_lock_timeout(Duration::from_millis(10));
    let id = loc_id_dir(&store, "HeLa", 1);
    store.put(&id, table_payload(), None).unwrap();

    let other = DirectoryBackend::open(dir.path()).unwrap();
    let held = other.try_lock(false).unwrap().expect("container is idle");

    // Readers coexist with a foreign shared lock; writers do not.
    assert_eq!(store.get(&id).unwrap(), table_payload());
    let err = store.delete(&id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Storage(StorageError::LockTimeout {
            mode: "exclusive",
            ..
        })
    ));
    drop(held);
}
