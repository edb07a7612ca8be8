use std::path::Path;

use super::{file_name, FilenameParser, ParseFailure};
use crate::identifier::RawFields;

/// Parser for `prefix_acqID.<ext>` filenames.
///
/// Everything before the last underscore-delimited integer run is the
/// prefix; everything after the first dot is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleParser;

impl FilenameParser for SimpleParser {
    fn parse(&self, path: &Path, dataset_type: &str) -> Result<RawFields, ParseFailure> {
        let name = file_name(path)?;
        let stem = name.split('.').next().unwrap_or(name);

        let (prefix, acq) =
            stem.rsplit_once('_')
                .ok_or_else(|| ParseFailure::MissingAcquisitionId {
                    file: name.to_owned(),
                })?;
        if acq.is_empty() || !acq.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseFailure::MissingAcquisitionId {
                file: name.to_owned(),
            });
        }
        let acq_id: u32 = acq
            .parse()
            .map_err(|_| ParseFailure::MissingAcquisitionId {
                file: name.to_owned(),
            })?;
        if prefix.is_empty() {
            return Err(ParseFailure::Malformed {
                file: name.to_owned(),
                reason: "prefix before the acquisition number is empty".to_owned(),
            });
        }

        Ok(RawFields::new(prefix, acq_id, dataset_type))
    }
}
