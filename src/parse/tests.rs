use super::*;
use std::path::Path;

use crate::identifier::PositionId;
use crate::registry::{LOCALIZATIONS, LOC_METADATA, WIDEFIELD_IMAGE};

#[test]
fn test_simple_parser_basic() {
    let raw = SimpleParser
        .parse(Path::new("HeLaL_Control_7.csv"), LOCALIZATIONS)
        .unwrap();
    assert_eq!(raw.prefix, "HeLaL_Control");
    assert_eq!(raw.acq_id, 7);
    assert_eq!(raw.dataset_type, "Localizations");
    assert_eq!(raw.channel, None);
}

#[test]
fn test_simple_parser_ignores_dotted_suffix() {
    let raw = SimpleParser
        .parse(Path::new("/data/run/HeLa_12.locResults.dat"), LOCALIZATIONS)
        .unwrap();
    assert_eq!(raw.prefix, "HeLa");
    assert_eq!(raw.acq_id, 12);
}

#[test]
fn test_simple_parser_requires_acquisition_number() {
    for name in ["HeLa.csv", "HeLa_.csv", "HeLa_x7.csv", "HeLa_+5.csv"] {
        let err = SimpleParser
            .parse(Path::new(name), LOCALIZATIONS)
            .unwrap_err();
        assert!(
            matches!(err, ParseFailure::MissingAcquisitionId { .. }),
            "{name:?} gave {err:?}"
        );
    }
}

#[test]
fn test_simple_parser_rejects_empty_prefix() {
    let err = SimpleParser
        .parse(Path::new("_7.csv"), LOCALIZATIONS)
        .unwrap_err();
    assert!(matches!(err, ParseFailure::Malformed { .. }));
}

#[test]
fn test_acquisition_parser_full_filename() {
    let raw = AcquisitionParser::new()
        .parse(
            Path::new("HeLaL_Control_A647_1_MMStack_Pos0_locResults.dat"),
            LOCALIZATIONS,
        )
        .unwrap();
    assert_eq!(raw.prefix, "HeLaL_Control");
    assert_eq!(raw.acq_id, 1);
    assert_eq!(raw.channel.as_deref(), Some("A647"));
    assert_eq!(raw.position, Some(PositionId::One(0)));
    assert_eq!(raw.slice, None);
}

#[test]
fn test_acquisition_parser_no_channel() {
    let raw = AcquisitionParser::new()
        .parse(
            Path::new("HeLaS_shTRF2_2_MMStack_Pos_001_004_locResults.dat"),
            LOCALIZATIONS,
        )
        .unwrap();
    assert_eq!(raw.prefix, "HeLaS_shTRF2");
    assert_eq!(raw.acq_id, 2);
    assert_eq!(raw.channel, None);
    assert_eq!(raw.position, Some(PositionId::Two(1, 4)));
}

#[test]
fn test_acquisition_parser_channel_anywhere_in_head() {
    let raw = AcquisitionParser::new()
        .parse(
            Path::new("Cy5_HeLa_Control_3_MMStack_Pos1_locResults.dat"),
            LOCALIZATIONS,
        )
        .unwrap();
    assert_eq!(raw.prefix, "HeLa_Control");
    assert_eq!(raw.channel.as_deref(), Some("Cy5"));
}

#[test]
fn test_acquisition_parser_slice_fragment() {
    let raw = AcquisitionParser::new()
        .parse(
            Path::new("HeLa_1_MMStack_Pos0_Slice12_locResults.dat"),
            LOCALIZATIONS,
        )
        .unwrap();
    assert_eq!(raw.position, Some(PositionId::One(0)));
    assert_eq!(raw.slice, Some(12));
}

#[test]
fn test_acquisition_parser_leading_underscore_and_doubles() {
    let raw = AcquisitionParser::new()
        .parse(
            Path::new("_HeLa__Control_1_MMStack_Pos0_locResults.dat"),
            LOCALIZATIONS,
        )
        .unwrap();
    assert_eq!(raw.prefix, "HeLa_Control");
    assert_eq!(raw.acq_id, 1);
}

#[test]
fn test_acquisition_parser_missing_marker() {
    let err = AcquisitionParser::new()
        .parse(Path::new("HeLa_1_Pos0_locResults.dat"), LOCALIZATIONS)
        .unwrap_err();
    assert!(matches!(err, ParseFailure::Malformed { .. }));
}

#[test]
fn test_acquisition_parser_missing_acquisition_number() {
    let err = AcquisitionParser::new()
        .parse(
            Path::new("HeLa_Control_MMStack_Pos0_locResults.dat"),
            LOCALIZATIONS,
        )
        .unwrap_err();
    assert!(matches!(err, ParseFailure::MissingAcquisitionId { .. }));
}

#[test]
fn test_acquisition_parser_metadata_file() {
    let raw = AcquisitionParser::new()
        .parse(
            Path::new("HeLaL_Control_1_MMStack_Pos0_locMetadata.json"),
            LOC_METADATA,
        )
        .unwrap();
    assert_eq!(raw.dataset_type, "LocMetadata");
    assert_eq!(raw.prefix, "HeLaL_Control");
    assert_eq!(raw.position, Some(PositionId::One(0)));
}

#[test]
fn test_acquisition_parser_custom_vocabulary() {
    let parser = AcquisitionParser::with_vocabulary(
        "_Capture_",
        vec!["GFP".to_owned(), "RFP".to_owned()],
    );
    let raw = parser
        .parse(Path::new("Sample_GFP_4_Capture_Pos2.ome.tif"), WIDEFIELD_IMAGE)
        .unwrap();
    assert_eq!(raw.prefix, "Sample");
    assert_eq!(raw.acq_id, 4);
    assert_eq!(raw.channel.as_deref(), Some("GFP"));
    assert_eq!(raw.position, Some(PositionId::One(2)));
}
