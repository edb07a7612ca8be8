//! # Dataset Identifiers
//!
//! A [`DatasetId`] is the unique, structured address of one dataset inside a
//! store: a required `(prefix, acq_id, dataset_type)` triple plus optional
//! channel, date, position, slice and replicate fields, and an optional
//! `describes` field for types that act as metadata about another type.
//!
//! Identifiers are immutable. They are constructed either through
//! [`DatasetIdBuilder`] (which validates every field against a
//! [`TypeRegistry`](crate::registry::TypeRegistry)) or by decoding a
//! physical key with [`crate::key::decode`]. The `with_*` methods return a
//! new value and never mutate the receiver.
//!
//! ## Ordering
//!
//! `DatasetId` implements a total order used by store enumeration: prefix
//! (lexical), then acquisition number (numeric), then dataset type
//! (lexical), then the remaining fields in declared order with an absent
//! field sorting before any present value. The order is consistent with
//! equality.
//!
//! ```rust
//! use locstore::identifier::DatasetId;
//! use locstore::registry::TypeRegistry;
//!
//! let registry = TypeRegistry::with_builtin_types();
//! let a = DatasetId::builder("A", 2, "Localizations").build(&registry)?;
//! let b = DatasetId::builder("B", 1, "Localizations").build(&registry)?;
//! assert!(a < b);
//! # Ok::<(), locstore::identifier::ValidationError>(())
//! ```

mod error;


pub use error::ValidationError;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::registry::TypeRegistry;

/// Characters that may never appear in a prefix. `/` is the key segment
/// separator.
const RESERVED_PREFIX_CHARS: &[char] = &['/'];

/// Characters that may never appear in a channel. Channels are embedded in
/// the underscore-tokenized leaf name, so `_` is reserved as well.
const RESERVED_CHANNEL_CHARS: &[char] = &['/', '_'];

/// A position identifier from the acquisition grid.
///
/// A one-element position comes from manually placed stage positions; a
/// two-element position carries the x and y indices of a position grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PositionId {
    /// A manually numbered position, e.g. `Pos0`.
    One(u32),
    /// A grid position with x and y indices, e.g. `Pos_001_004`.
    Two(u32, u32),
}

/// The unique address of one dataset within a store.
///
/// Field declaration order is load-bearing: the derived `Ord` implements
/// the canonical enumeration order of the store.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DatasetId {
    prefix: String,
    acq_id: u32,
    dataset_type: String,
    describes: Option<String>,
    channel: Option<String>,
    date: Option<NaiveDate>,
    position: Option<PositionId>,
    slice: Option<u32>,
    replicate: Option<u32>,
}

impl DatasetId {
    /// Start building an identifier from the three required fields.
    pub fn builder(
        prefix: impl Into<String>,
        acq_id: u32,
        dataset_type: impl Into<String>,
    ) -> DatasetIdBuilder {
        DatasetIdBuilder {
            prefix: prefix.into(),
            acq_id,
            dataset_type: dataset_type.into(),
            describes: None,
            channel: None,
            date: None,
            position: None,
            slice: None,
            replicate: None,
        }
    }

    /// Validate raw parser output into an identifier.
    pub fn from_raw(raw: RawFields, registry: &TypeRegistry) -> Result<Self, ValidationError> {
        let mut builder = Self::builder(raw.prefix, raw.acq_id, raw.dataset_type);
        if let Some(describes) = raw.describes {
            builder = builder.describes(describes);
        }
        if let Some(channel) = raw.channel {
            builder = builder.channel(channel);
        }
        if let Some((year, month, day)) = raw.date {
            let date = NaiveDate::from_ymd_opt(year, month, day)
                .ok_or(ValidationError::InvalidDate { year, month, day })?;
            builder = builder.date(date);
        }
        if let Some(position) = raw.position {
            builder = builder.position(position);
        }
        if let Some(slice) = raw.slice {
            builder = builder.slice(slice);
        }
        if let Some(replicate) = raw.replicate {
            builder = builder.replicate(replicate);
        }
        builder.build(registry)
    }

    /// The group name shared by related acquisitions.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The acquisition number within the prefix group.
    pub fn acq_id(&self) -> u32 {
        self.acq_id
    }

    /// The registered dataset type name.
    pub fn dataset_type(&self) -> &str {
        &self.dataset_type
    }

    /// The dataset type this dataset describes, when it acts as metadata.
    pub fn describes(&self) -> Option<&str> {
        self.describes.as_deref()
    }

    /// The color channel, if any.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// The acquisition date, if any.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// The stage position, if any.
    pub fn position(&self) -> Option<PositionId> {
        self.position
    }

    /// The z-slice number, if any.
    pub fn slice(&self) -> Option<u32> {
        self.slice
    }

    /// The replicate number, if any.
    pub fn replicate(&self) -> Option<u32> {
        self.replicate
    }

    /// Return a copy with a different prefix.
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Result<Self, ValidationError> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        let mut id = self.clone();
        id.prefix = prefix;
        Ok(id)
    }

    /// Return a copy with a different acquisition number.
    pub fn with_acq_id(&self, acq_id: u32) -> Self {
        let mut id = self.clone();
        id.acq_id = acq_id;
        id
    }

    /// Return a copy with the channel replaced (or cleared).
    pub fn with_channel(&self, channel: Option<String>) -> Result<Self, ValidationError> {
        if let Some(channel) = channel.as_deref() {
            validate_channel(channel)?;
        }
        let mut id = self.clone();
        id.channel = channel;
        Ok(id)
    }

    /// Return a copy with the date replaced (or cleared).
    pub fn with_date(&self, date: Option<NaiveDate>) -> Result<Self, ValidationError> {
        if let Some(date) = date {
            validate_date(date)?;
        }
        let mut id = self.clone();
        id.date = date;
        Ok(id)
    }

    /// Return a copy with the position replaced (or cleared).
    pub fn with_position(&self, position: Option<PositionId>) -> Self {
        let mut id = self.clone();
        id.position = position;
        id
    }

    /// Return a copy with the slice replaced (or cleared).
    pub fn with_slice(&self, slice: Option<u32>) -> Self {
        let mut id = self.clone();
        id.slice = slice;
        id
    }

    /// Return a copy with the replicate replaced (or cleared).
    pub fn with_replicate(&self, replicate: Option<u32>) -> Self {
        let mut id = self.clone();
        id.replicate = replicate;
        id
    }

    /// Construct an identifier directly from already-validated parts.
    ///
    /// Only the key codec uses this; every other construction path must go
    /// through the builder.
    pub(crate) fn from_decoded_parts(
        prefix: String,
        acq_id: u32,
        dataset_type: String,
        describes: Option<String>,
        channel: Option<String>,
        date: Option<NaiveDate>,
        position: Option<PositionId>,
        slice: Option<u32>,
        replicate: Option<u32>,
    ) -> Self {
        DatasetId {
            prefix,
            acq_id,
            dataset_type,
            describes,
            channel,
            date,
            position,
            slice,
            replicate,
        }
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} [{}", self.prefix, self.acq_id, self.dataset_type)?;
        if let Some(describes) = &self.describes {
            write!(f, " describes {describes}")?;
        }
        if let Some(channel) = &self.channel {
            write!(f, ", channel {channel}")?;
        }
        if let Some(date) = &self.date {
            write!(f, ", date {date}")?;
        }
        match self.position {
            Some(PositionId::One(n)) => write!(f, ", pos {n}")?,
            Some(PositionId::Two(x, y)) => write!(f, ", pos ({x}, {y})")?,
            None => {}
        }
        if let Some(slice) = self.slice {
            write!(f, ", slice {slice}")?;
        }
        if let Some(replicate) = self.replicate {
            write!(f, ", replicate {replicate}")?;
        }
        write!(f, "]")
    }
}

/// Unvalidated identifier fields as produced by a filename parser.
///
/// Dates are carried as raw `(year, month, day)` triples and positions as
/// `(first, Option<second>)` pairs; [`DatasetId::from_raw`] turns them into
/// their validated forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFields {
    /// Group name, possibly containing underscores.
    pub prefix: String,
    /// Acquisition number.
    pub acq_id: u32,
    /// Dataset type name, to be checked against the registry.
    pub dataset_type: String,
    /// Described type name for metadata-like types.
    pub describes: Option<String>,
    /// Raw channel string.
    pub channel: Option<String>,
    /// Raw calendar date.
    pub date: Option<(i32, u32, u32)>,
    /// Raw position.
    pub position: Option<PositionId>,
    /// Raw slice number.
    pub slice: Option<u32>,
    /// Raw replicate number.
    pub replicate: Option<u32>,
}

impl RawFields {
    /// Raw fields with only the required triple set.
    pub fn new(prefix: impl Into<String>, acq_id: u32, dataset_type: impl Into<String>) -> Self {
        RawFields {
            prefix: prefix.into(),
            acq_id,
            dataset_type: dataset_type.into(),
            describes: None,
            channel: None,
            date: None,
            position: None,
            slice: None,
            replicate: None,
        }
    }
}

/// Builder for [`DatasetId`]. Terminated by [`build`](Self::build), which
/// performs all validation against the registry.
#[derive(Debug, Clone)]
pub struct DatasetIdBuilder {
    prefix: String,
    acq_id: u32,
    dataset_type: String,
    describes: Option<String>,
    channel: Option<String>,
    date: Option<NaiveDate>,
    position: Option<PositionId>,
    slice: Option<u32>,
    replicate: Option<u32>,
}

impl DatasetIdBuilder {
    /// Set the described type for metadata-like datasets.
    ///
    /// When left unset, the described type is filled in from the registered
    /// contract of `dataset_type`; setting it to a value that disagrees
    /// with the contract fails validation.
    pub fn describes(mut self, describes: impl Into<String>) -> Self {
        self.describes = Some(describes.into());
        self
    }

    /// Set the color channel.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Set the acquisition date.
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the stage position.
    pub fn position(mut self, position: PositionId) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the z-slice number.
    pub fn slice(mut self, slice: u32) -> Self {
        self.slice = Some(slice);
        self
    }

    /// Set the replicate number.
    pub fn replicate(mut self, replicate: u32) -> Self {
        self.replicate = Some(replicate);
        self
    }

    /// Validate every field against the registry and produce an identifier.
    pub fn build(self, registry: &TypeRegistry) -> Result<DatasetId, ValidationError> {
        validate_prefix(&self.prefix)?;

        if let Some(channel) = self.channel.as_deref() {
            validate_channel(channel)?;
        }

        if let Some(date) = self.date {
            validate_date(date)?;
        }

        if !registry.is_registered(&self.dataset_type) {
            return Err(ValidationError::UnknownDatasetType {
                name: self.dataset_type,
            });
        }
        let contract_describes = registry
            .contract_for(&self.dataset_type)
            .expect("registration checked above")
            .describes()
            .map(str::to_owned);

        let describes = match (self.describes, &contract_describes) {
            // Fill in the described type from the contract when unset.
            (None, Some(target)) => Some(target.clone()),
            (None, None) => None,
            (Some(actual), expected) => {
                if expected.as_deref() != Some(actual.as_str()) {
                    return Err(ValidationError::DescribesMismatch {
                        dataset_type: self.dataset_type,
                        expected: contract_describes,
                        actual: Some(actual),
                    });
                }
                Some(actual)
            }
        };

        if let Some(describes) = describes.as_deref() {
            if !registry.is_registered(describes) {
                return Err(ValidationError::UnknownDescribedType {
                    name: describes.to_owned(),
                });
            }
        }

        Ok(DatasetId {
            prefix: self.prefix,
            acq_id: self.acq_id,
            dataset_type: self.dataset_type,
            describes,
            channel: self.channel,
            date: self.date,
            position: self.position,
            slice: self.slice,
            replicate: self.replicate,
        })
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() {
        return Err(ValidationError::EmptyPrefix);
    }
    for &reserved in RESERVED_PREFIX_CHARS {
        if prefix.contains(reserved) {
            return Err(ValidationError::ReservedCharacterInPrefix {
                prefix: prefix.to_owned(),
                reserved,
            });
        }
    }
    // The acquisition segment of a key is split from the right on the last
    // underscore-delimited integer run. A prefix whose final token is a
    // bare integer would be swallowed by that split, so it is rejected
    // here rather than disambiguated in the codec.
    let last_token = prefix.rsplit('_').next().unwrap_or(prefix);
    if !last_token.is_empty() && last_token.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::AmbiguousPrefix {
            prefix: prefix.to_owned(),
        });
    }
    Ok(())
}

/// The key grammar renders the year as exactly four digits, so the wider
/// range `chrono` accepts would encode into segments that cannot decode.
fn validate_date(date: NaiveDate) -> Result<(), ValidationError> {
    let year = date.year();
    if !(0..=9999).contains(&year) {
        return Err(ValidationError::DateYearOutOfRange { year });
    }
    Ok(())
}

fn validate_channel(channel: &str) -> Result<(), ValidationError> {
    if channel.is_empty() {
        return Err(ValidationError::EmptyChannel);
    }
    for &reserved in RESERVED_CHANNEL_CHARS {
        if channel.contains(reserved) {
            return Err(ValidationError::ReservedCharacterInChannel {
                channel: channel.to_owned(),
                reserved,
            });
        }
    }
    Ok(())
}
