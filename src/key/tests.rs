use super::*;
use crate::identifier::DatasetId;
use crate::registry::{TypeRegistry, LOCALIZATIONS, LOC_METADATA, WIDEFIELD_IMAGE};

fn registry() -> TypeRegistry {
    TypeRegistry::with_builtin_types()
}

#[test]
fn test_encode_minimal() {
    let id = DatasetId::builder("HeLaL_Control", 1, LOCALIZATIONS)
        .build(&registry())
        .unwrap();
    assert_eq!(
        encode(&id),
        "HeLaL_Control/HeLaL_Control_1/Localizations"
    );
}

#[test]
fn test_encode_channel_and_position() {
    let id = DatasetId::builder("HeLaL_Control", 1, LOCALIZATIONS)
        .channel("A647")
        .position(PositionId::One(0))
        .build(&registry())
        .unwrap();
    assert_eq!(
        encode(&id),
        "HeLaL_Control/HeLaL_Control_1/Localizations_ChannelA647_Pos0"
    );
}

#[test]
fn test_encode_two_element_position_zero_padded() {
    let id = DatasetId::builder("HeLaS_shTRF2", 2, WIDEFIELD_IMAGE)
        .position(PositionId::Two(1, 4))
        .build(&registry())
        .unwrap();
    assert_eq!(
        encode(&id),
        "HeLaS_shTRF2/HeLaS_shTRF2_2/WidefieldImage_Pos_001_004"
    );
}

#[test]
fn test_encode_date_segment() {
    let id = DatasetId::builder("HeLa", 3, LOCALIZATIONS)
        .date(NaiveDate::from_ymd_opt(2016, 6, 30).unwrap())
        .build(&registry())
        .unwrap();
    assert_eq!(encode(&id), "HeLa/d2016_06_30/HeLa_3/Localizations");
}

#[test]
fn test_date_round_trips_at_year_bounds() {
    // Validation caps years at the four-digit range, so every date an
    // identifier can carry has a decodable segment.
    let registry = registry();
    for year in [0, 9999] {
        let id = DatasetId::builder("HeLa", 3, LOCALIZATIONS)
            .date(NaiveDate::from_ymd_opt(year, 6, 30).unwrap())
            .build(&registry)
            .unwrap();
        let key = encode(&id);
        assert_eq!(decode(&key, &registry).unwrap(), id, "key {key:?}");
    }
}

#[test]
fn test_encode_full_leaf_order() {
    let id = DatasetId::builder("HeLa", 3, LOCALIZATIONS)
        .channel("DAPI")
        .position(PositionId::One(2))
        .slice(5)
        .replicate(1)
        .build(&registry())
        .unwrap();
    assert_eq!(
        encode(&id),
        "HeLa/HeLa_3/Localizations_ChannelDAPI_Pos2_Slice5_Replicate1"
    );
}

#[test]
fn test_describing_type_encodes_under_described_leaf() {
    let registry = registry();
    let meta = DatasetId::builder("HeLa", 1, LOC_METADATA)
        .build(&registry)
        .unwrap();
    let described = DatasetId::builder("HeLa", 1, LOCALIZATIONS)
        .build(&registry)
        .unwrap();
    assert_eq!(encode(&meta), encode(&described));
}

#[test]
fn test_decode_round_trip() {
    let registry = registry();
    let ids = [
        DatasetId::builder("HeLaL_Control", 1, LOCALIZATIONS)
            .channel("A647")
            .position(PositionId::One(0))
            .build(&registry)
            .unwrap(),
        DatasetId::builder("HeLaS_shTRF2", 2, WIDEFIELD_IMAGE)
            .position(PositionId::Two(1, 4))
            .build(&registry)
            .unwrap(),
        DatasetId::builder("HeLa", 3, LOCALIZATIONS)
            .date(NaiveDate::from_ymd_opt(2016, 6, 30).unwrap())
            .slice(9)
            .replicate(2)
            .build(&registry)
            .unwrap(),
    ];
    for id in ids {
        let key = encode(&id);
        assert_eq!(decode(&key, &registry).unwrap(), id, "key {key:?}");
    }
}

#[test]
fn test_decode_underscored_prefix() {
    let registry = registry();
    let id = decode(
        "Heavily_Underscored_Name/Heavily_Underscored_Name_42/Localizations",
        &registry,
    )
    .unwrap();
    assert_eq!(id.prefix(), "Heavily_Underscored_Name");
    assert_eq!(id.acq_id(), 42);
}

#[test]
fn test_decode_unknown_fragment() {
    let err = decode(
        "HeLa/HeLa_1/Localizations_Bogus5",
        &registry(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        KeyParseError::UnknownFragment {
            fragment: "_Bogus5".to_owned(),
            leaf: "Localizations_Bogus5".to_owned(),
        }
    );
}

#[test]
fn test_decode_misordered_fragments() {
    let err = decode(
        "HeLa/HeLa_1/Localizations_Pos0_ChannelA647",
        &registry(),
    )
    .unwrap_err();
    assert!(matches!(err, KeyParseError::MisplacedFragment { .. }));

    let err = decode(
        "HeLa/HeLa_1/Localizations_Pos0_Pos1",
        &registry(),
    )
    .unwrap_err();
    assert!(matches!(err, KeyParseError::MisplacedFragment { .. }));
}

#[test]
fn test_decode_unknown_type() {
    let err = decode("HeLa/HeLa_1/Chromatogram", &registry()).unwrap_err();
    assert!(matches!(err, KeyParseError::UnknownType(_)));
}

#[test]
fn test_decode_group_mismatch() {
    let err = decode("HeLa/Other_1/Localizations", &registry()).unwrap_err();
    assert!(matches!(err, KeyParseError::GroupMismatch { .. }));
}

#[test]
fn test_decode_malformed_acquisition() {
    let err = decode("HeLa/HeLa_x/Localizations", &registry()).unwrap_err();
    assert!(matches!(err, KeyParseError::MalformedNumber { .. }));

    let err = decode("HeLa/HeLa/Localizations", &registry()).unwrap_err();
    assert!(matches!(
        err,
        KeyParseError::MalformedNumber { .. } | KeyParseError::MalformedAcquisition { .. }
    ));
}

#[test]
fn test_decode_malformed_date() {
    for key in [
        "HeLa/2016_06_30/HeLa_1/Localizations",
        "HeLa/d2016-06-30/HeLa_1/Localizations",
        "HeLa/d16_06_30/HeLa_1/Localizations",
        "HeLa/d2016_02_30/HeLa_1/Localizations",
    ] {
        let err = decode(key, &registry()).unwrap_err();
        assert!(
            matches!(err, KeyParseError::MalformedDate { .. }),
            "key {key:?} gave {err:?}"
        );
    }
}

#[test]
fn test_decode_segment_count() {
    for key in ["HeLa", "HeLa/HeLa_1", "a/b/c/d/e"] {
        let err = decode(key, &registry()).unwrap_err();
        assert!(matches!(err, KeyParseError::SegmentCount { .. }));
    }
}

#[test]
fn test_decode_empty_segment() {
    let err = decode("HeLa//Localizations", &registry()).unwrap_err();
    assert!(matches!(err, KeyParseError::EmptySegment { .. }));
}

#[test]
fn test_decode_bare_channel_tag() {
    let err = decode("HeLa/HeLa_1/Localizations_Channel", &registry()).unwrap_err();
    assert!(matches!(err, KeyParseError::UnknownFragment { .. }));
}

#[test]
fn test_decode_overflowing_number() {
    let err = decode(
        "HeLa/HeLa_99999999999999999999/Localizations",
        &registry(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        KeyParseError::MalformedNumber { field: "acqID", .. }
    ));
}
