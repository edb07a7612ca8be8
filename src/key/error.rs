use crate::registry::UnknownDatasetType;

/// Errors raised when a physical key cannot be decoded back into a
/// dataset identifier.
///
/// Containers may legitimately hold keys written by unrelated tools, so
/// every variant names the fragment that failed and the field it was
/// expected to satisfy; callers enumerating a container log and skip these
/// rather than aborting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    /// Keys hold exactly three segments, or four when a date segment is
    /// present.
    #[error("key {key:?} must have 3 segments (4 with a date segment), found {count}")]
    SegmentCount {
        /// The offending key.
        key: String,
        /// How many segments it had.
        count: usize,
    },

    /// A key segment was empty.
    #[error("key {key:?} contains an empty segment")]
    EmptySegment {
        /// The offending key.
        key: String,
    },

    /// The date segment did not match `d<YYYY_MM_DD>` or named an invalid
    /// calendar date.
    #[error("segment {segment:?} is not a date segment of the form d<YYYY_MM_DD>")]
    MalformedDate {
        /// The offending segment.
        segment: String,
    },

    /// The acquisition segment held no trailing integer run.
    #[error("segment {segment:?} is not an acquisition segment of the form <prefix>_<acqID>")]
    MalformedAcquisition {
        /// The offending segment.
        segment: String,
    },

    /// The acquisition segment's prefix part disagrees with the group
    /// segment.
    #[error("acquisition segment {segment:?} does not belong to group {group:?}")]
    GroupMismatch {
        /// The offending acquisition segment.
        segment: String,
        /// The group segment it appeared under.
        group: String,
    },

    /// A leaf fragment matched no known field tag.
    #[error("fragment {fragment:?} in leaf {leaf:?} matches no known field tag")]
    UnknownFragment {
        /// The unrecognized fragment, with its leading underscore.
        fragment: String,
        /// The leaf name it appeared in.
        leaf: String,
    },

    /// A recognized tag appeared out of the fixed field order (or twice).
    #[error("fragment {fragment:?} is out of order in leaf {leaf:?}")]
    MisplacedFragment {
        /// The out-of-place fragment.
        fragment: String,
        /// The leaf name it appeared in.
        leaf: String,
    },

    /// A tag's numeric value failed to parse.
    #[error("fragment {fragment:?} holds a malformed number for field {field}")]
    MalformedNumber {
        /// The offending fragment.
        fragment: String,
        /// The identifier field the number was expected to satisfy.
        field: &'static str,
    },

    /// The leaf's type name is not present in the registry.
    #[error(transparent)]
    UnknownType(#[from] UnknownDatasetType),
}
