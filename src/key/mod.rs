//! # Key Codec
//!
//! Bidirectional transform between a [`DatasetId`] and the canonical
//! hierarchical key it occupies inside a container.
//!
//! ## Encoding grammar
//!
//! ```text
//! <prefix>[/d<YYYY_MM_DD>]/<prefix>_<acqID>/<leaf>
//! leaf := <TypeName>[_Channel<c>][_Pos<n> | _Pos_<iii>_<jjj>][_Slice<n>][_Replicate<n>]
//! ```
//!
//! - The date segment replaces the hyphens of an ISO date with underscores
//!   to satisfy the container's naming restrictions.
//! - The acquisition number is rendered as a plain decimal with no padding;
//!   two-element positions are zero-padded to three digits each.
//! - Absent optional fields are skipped entirely; present fields always
//!   appear in the fixed order channel, position, slice, replicate.
//! - A type that describes another type (metadata) encodes under the
//!   *described* type's leaf name; its own type name travels through the
//!   container's attribute side channel, not the key.
//!
//! ## Round-trip laws
//!
//! `decode(encode(id)) == id` for every valid identifier that does not
//! describe another type, and `encode(decode(key)) == key` for every key
//! this codec produced. Decoding is canonical only on the codec's own
//! output; arbitrary third-party keys fail with a [`KeyParseError`] naming
//! the offending fragment.
//!
//! ```rust
//! use locstore::identifier::{DatasetId, PositionId};
//! use locstore::key;
//! use locstore::registry::TypeRegistry;
//!
//! let registry = TypeRegistry::with_builtin_types();
//! let id = DatasetId::builder("HeLaL_Control", 1, "Localizations")
//!     .channel("A647")
//!     .position(PositionId::One(0))
//!     .build(&registry)?;
//!
//! let key = key::encode(&id);
//! assert_eq!(key, "HeLaL_Control/HeLaL_Control_1/Localizations_ChannelA647_Pos0");
//! assert_eq!(key::decode(&key, &registry)?, id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;

#[cfg(test)]
mod tests;

pub use error::KeyParseError;

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate};

use crate::identifier::{DatasetId, PositionId};
use crate::registry::TypeRegistry;

/// Separator between key segments.
pub const SEPARATOR: char = '/';

const CHANNEL_TAG: &str = "Channel";
const POSITION_TAG: &str = "Pos";
const SLICE_TAG: &str = "Slice";
const REPLICATE_TAG: &str = "Replicate";

/// Encode an identifier into its canonical key.
pub fn encode(id: &DatasetId) -> String {
    let mut key = String::new();

    key.push_str(id.prefix());
    if let Some(date) = id.date() {
        key.push(SEPARATOR);
        key.push_str(&encode_date_segment(date));
    }
    key.push(SEPARATOR);
    let _ = write!(key, "{}_{}", id.prefix(), id.acq_id());
    key.push(SEPARATOR);

    // Metadata-like types live under the key of the type they describe.
    key.push_str(id.describes().unwrap_or_else(|| id.dataset_type()));

    if let Some(channel) = id.channel() {
        let _ = write!(key, "_{CHANNEL_TAG}{channel}");
    }
    match id.position() {
        Some(PositionId::One(n)) => {
            let _ = write!(key, "_{POSITION_TAG}{n}");
        }
        Some(PositionId::Two(x, y)) => {
            let _ = write!(key, "_{POSITION_TAG}_{x:03}_{y:03}");
        }
        None => {}
    }
    if let Some(slice) = id.slice() {
        let _ = write!(key, "_{SLICE_TAG}{slice}");
    }
    if let Some(replicate) = id.replicate() {
        let _ = write!(key, "_{REPLICATE_TAG}{replicate}");
    }

    key
}

/// Decode a physical key back into an identifier.
///
/// The returned identifier always carries the leaf's own type as
/// `dataset_type`; reconstructing a describing (metadata) identifier from
/// the attribute side channel is the store's job, not the codec's.
pub fn decode(key: &str, registry: &TypeRegistry) -> Result<DatasetId, KeyParseError> {
    let segments: Vec<&str> = key.split(SEPARATOR).collect();
    if !(3..=4).contains(&segments.len()) {
        return Err(KeyParseError::SegmentCount {
            key: key.to_owned(),
            count: segments.len(),
        });
    }
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(KeyParseError::EmptySegment {
            key: key.to_owned(),
        });
    }

    let prefix = segments[0];
    let date = if segments.len() == 4 {
        Some(decode_date_segment(segments[1])?)
    } else {
        None
    };
    let acquisition_segment = segments[segments.len() - 2];
    let leaf = segments[segments.len() - 1];

    let acq_id = decode_acquisition_segment(prefix, acquisition_segment)?;
    let (dataset_type, channel, position, slice, replicate) = decode_leaf(leaf, registry)?;

    // Keep the describes field consistent with the contract even for
    // foreign keys that name a describing type directly.
    let describes = registry
        .contract_for(&dataset_type)
        .map_err(KeyParseError::UnknownType)?
        .describes()
        .map(str::to_owned);

    Ok(DatasetId::from_decoded_parts(
        prefix.to_owned(),
        acq_id,
        dataset_type,
        describes,
        channel,
        date,
        position,
        slice,
        replicate,
    ))
}

fn encode_date_segment(date: NaiveDate) -> String {
    format!(
        "d{:04}_{:02}_{:02}",
        date.year(),
        date.month(),
        date.day()
    )
}

fn decode_date_segment(segment: &str) -> Result<NaiveDate, KeyParseError> {
    let malformed = || KeyParseError::MalformedDate {
        segment: segment.to_owned(),
    };

    let digits = segment.strip_prefix('d').ok_or_else(malformed)?;
    let mut parts = digits.split('_');
    let (year, month, day) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day), None) => (year, month, day),
        _ => return Err(malformed()),
    };
    if year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return Err(malformed());
    }
    let year: i32 = parse_digits(year).ok_or_else(malformed)?;
    let month: u32 = parse_digits(month).ok_or_else(malformed)?;
    let day: u32 = parse_digits(day).ok_or_else(malformed)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
}

/// Split the acquisition segment on its last underscore-delimited integer
/// run. Splitting from the right lets prefixes contain underscores.
fn decode_acquisition_segment(group: &str, segment: &str) -> Result<u32, KeyParseError> {
    let (segment_prefix, acq) =
        segment
            .rsplit_once('_')
            .ok_or_else(|| KeyParseError::MalformedAcquisition {
                segment: segment.to_owned(),
            })?;

    let acq_id: u32 = parse_digits(acq).ok_or_else(|| KeyParseError::MalformedNumber {
        fragment: acq.to_owned(),
        field: "acqID",
    })?;

    if segment_prefix != group {
        return Err(KeyParseError::GroupMismatch {
            segment: segment.to_owned(),
            group: group.to_owned(),
        });
    }

    Ok(acq_id)
}

/// Relative position of each leaf tag in the fixed field order.
#[derive(PartialEq, PartialOrd)]
enum LeafStage {
    Type,
    Channel,
    Position,
    Slice,
    Replicate,
}

type LeafFields = (
    String,
    Option<String>,
    Option<PositionId>,
    Option<u32>,
    Option<u32>,
);

fn decode_leaf(leaf: &str, registry: &TypeRegistry) -> Result<LeafFields, KeyParseError> {
    let mut tokens = leaf.split('_');
    let dataset_type = tokens.next().unwrap_or_default();
    if !registry.is_registered(dataset_type) {
        return Err(KeyParseError::UnknownType(
            crate::registry::UnknownDatasetType {
                name: dataset_type.to_owned(),
            },
        ));
    }

    let mut stage = LeafStage::Type;
    let mut channel = None;
    let mut position = None;
    let mut slice = None;
    let mut replicate = None;

    let mut tokens = tokens.peekable();
    while let Some(token) = tokens.next() {
        if let Some(rest) = token.strip_prefix(CHANNEL_TAG) {
            advance_stage(&mut stage, LeafStage::Channel, token, leaf)?;
            if rest.is_empty() {
                return Err(KeyParseError::UnknownFragment {
                    fragment: format!("_{token}"),
                    leaf: leaf.to_owned(),
                });
            }
            channel = Some(rest.to_owned());
        } else if token == POSITION_TAG {
            // Bare `Pos` introduces a zero-padded two-element position
            // spanning the next two tokens.
            advance_stage(&mut stage, LeafStage::Position, token, leaf)?;
            let x = tokens
                .next()
                .and_then(|t| parse_digits::<u32>(t))
                .ok_or_else(|| KeyParseError::MalformedNumber {
                    fragment: format!("_{token}"),
                    field: "positionID",
                })?;
            let y = tokens
                .next()
                .and_then(|t| parse_digits::<u32>(t))
                .ok_or_else(|| KeyParseError::MalformedNumber {
                    fragment: format!("_{token}"),
                    field: "positionID",
                })?;
            position = Some(PositionId::Two(x, y));
        } else if let Some(rest) = strip_numeric_tag(token, POSITION_TAG) {
            advance_stage(&mut stage, LeafStage::Position, token, leaf)?;
            let n = parse_digits::<u32>(rest).ok_or_else(|| KeyParseError::MalformedNumber {
                fragment: format!("_{token}"),
                field: "positionID",
            })?;
            position = Some(PositionId::One(n));
        } else if let Some(rest) = strip_numeric_tag(token, SLICE_TAG) {
            advance_stage(&mut stage, LeafStage::Slice, token, leaf)?;
            slice = Some(parse_digits::<u32>(rest).ok_or_else(|| {
                KeyParseError::MalformedNumber {
                    fragment: format!("_{token}"),
                    field: "sliceID",
                }
            })?);
        } else if let Some(rest) = strip_numeric_tag(token, REPLICATE_TAG) {
            advance_stage(&mut stage, LeafStage::Replicate, token, leaf)?;
            replicate = Some(parse_digits::<u32>(rest).ok_or_else(|| {
                KeyParseError::MalformedNumber {
                    fragment: format!("_{token}"),
                    field: "replicateID",
                }
            })?);
        } else {
            return Err(KeyParseError::UnknownFragment {
                fragment: format!("_{token}"),
                leaf: leaf.to_owned(),
            });
        }
    }

    Ok((dataset_type.to_owned(), channel, position, slice, replicate))
}

fn advance_stage(
    stage: &mut LeafStage,
    next: LeafStage,
    token: &str,
    leaf: &str,
) -> Result<(), KeyParseError> {
    if *stage >= next {
        return Err(KeyParseError::MisplacedFragment {
            fragment: format!("_{token}"),
            leaf: leaf.to_owned(),
        });
    }
    *stage = next;
    Ok(())
}

/// Strip `tag` from a token that is expected to continue with a value, so
/// that a bare tag or a tag-shaped unknown word is not misread.
fn strip_numeric_tag<'a>(token: &'a str, tag: &str) -> Option<&'a str> {
    token
        .strip_prefix(tag)
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Parse a non-empty all-digit string. Returns `None` on any other input,
/// including overflow.
fn parse_digits<T: std::str::FromStr>(digits: &str) -> Option<T> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
