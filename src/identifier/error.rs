/// Errors raised when assembling or validating a dataset identifier.
///
/// Every variant names the offending field so the failure is actionable
/// without inspecting internals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The prefix is empty.
    #[error("prefix must not be empty")]
    EmptyPrefix,

    /// The prefix contains a character reserved by the key grammar.
    #[error("prefix {prefix:?} contains reserved character {reserved:?}")]
    ReservedCharacterInPrefix {
        /// The rejected prefix.
        prefix: String,
        /// The reserved character that was found.
        reserved: char,
    },

    /// The prefix ends in a bare integer run, which is indistinguishable
    /// from the acquisition number when a key is split from the right.
    #[error("prefix {prefix:?} ends in a bare integer and would be ambiguous with the acquisition number")]
    AmbiguousPrefix {
        /// The rejected prefix.
        prefix: String,
    },

    /// The channel contains a character reserved by the key grammar.
    #[error("channel {channel:?} contains reserved character {reserved:?}")]
    ReservedCharacterInChannel {
        /// The rejected channel.
        channel: String,
        /// The reserved character that was found.
        reserved: char,
    },

    /// The channel is empty.
    #[error("channel must not be empty when present")]
    EmptyChannel,

    /// The dataset type is not present in the registry.
    #[error("dataset type {name:?} is not registered")]
    UnknownDatasetType {
        /// The unregistered type name.
        name: String,
    },

    /// The described type is not present in the registry.
    #[error("described type {name:?} is not registered")]
    UnknownDescribedType {
        /// The unregistered type name.
        name: String,
    },

    /// The date year cannot be rendered as the four-digit year the key
    /// grammar requires.
    #[error("date year {year} is outside the representable range 0..=9999")]
    DateYearOutOfRange {
        /// The rejected year.
        year: i32,
    },

    /// The raw date fields do not form a valid calendar date.
    #[error("{year:04}-{month:02}-{day:02} is not a valid calendar date")]
    InvalidDate {
        /// Raw year.
        year: i32,
        /// Raw month.
        month: u32,
        /// Raw day.
        day: u32,
    },

    /// The describes field disagrees with the type's registered contract.
    #[error(
        "dataset type {dataset_type:?} declares describes = {expected:?} \
         but the identifier carries {actual:?}"
    )]
    DescribesMismatch {
        /// The identifier's dataset type.
        dataset_type: String,
        /// What the registered contract declares.
        expected: Option<String>,
        /// What the identifier carried.
        actual: Option<String>,
    },
}
