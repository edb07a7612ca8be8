//! # Filename Parsers
//!
//! A [`FilenameParser`] derives raw identifier fields from a file's name.
//! Parsers produce [`RawFields`] only; validation into a
//! [`DatasetId`](crate::identifier::DatasetId) is the identifier model's
//! job, not the parser's.
//!
//! Two parsers ship with the crate:
//!
//! - [`SimpleParser`]: `prefix_acqID.<ext>` filenames.
//! - [`AcquisitionParser`]: acquisition-software filenames with a marker
//!   token, channel vocabulary and position fragments, e.g.
//!   `HeLaL_Control_1_MMStack_Pos0_locResults.dat`.

mod acquisition;
mod simple;

#[cfg(test)]
mod tests;

pub use acquisition::{AcquisitionParser, DEFAULT_CHANNELS, DEFAULT_MARKER};
pub use simple::SimpleParser;

use std::path::Path;

use crate::identifier::RawFields;

/// Errors raised when a filename yields no identifier fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// The filename holds no trailing acquisition number.
    #[error("filename {file:?} does not end in an acquisition number")]
    MissingAcquisitionId {
        /// The offending filename.
        file: String,
    },

    /// The filename does not follow the parser's grammar.
    #[error("filename {file:?} could not be parsed: {reason}")]
    Malformed {
        /// The offending filename.
        file: String,
        /// What was expected.
        reason: String,
    },
}

/// Derives raw identifier fields from filenames.
///
/// Parsing is pure and touches no store state, so build orchestration may
/// run parsers concurrently.
pub trait FilenameParser: Send + Sync {
    /// Parse one filename into raw fields for the given dataset type.
    fn parse(&self, path: &Path, dataset_type: &str) -> Result<RawFields, ParseFailure>;
}

/// The file name portion of a path, as UTF-8.
fn file_name(path: &Path) -> Result<&str, ParseFailure> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ParseFailure::Malformed {
            file: path.display().to_string(),
            reason: "path has no UTF-8 file name".to_owned(),
        })
}
