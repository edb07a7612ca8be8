use std::path::Path;

use super::{file_name, FilenameParser, ParseFailure};
use crate::identifier::{PositionId, RawFields};

/// Default acquisition marker token separating prefix from suffix.
pub const DEFAULT_MARKER: &str = "_MMStack_";

/// Default channel vocabulary: shorthand names for common fluorophores.
pub const DEFAULT_CHANNELS: &[&str] = &["A488", "A647", "A750", "DAPI", "Cy5"];

/// Parser for acquisition-software filenames.
///
/// Filenames look like `prefix[_channel]_acqID<marker>suffix`, e.g.
/// `HeLaL_Control_A647_1_MMStack_Pos0_locResults.dat`. The prefix side is
/// split from the right on the acquisition number and scrubbed of channel
/// tokens; the suffix side is scanned for `Pos…` and `Slice…` fragments.
#[derive(Debug, Clone)]
pub struct AcquisitionParser {
    marker: String,
    channels: Vec<String>,
}

impl Default for AcquisitionParser {
    fn default() -> Self {
        AcquisitionParser {
            marker: DEFAULT_MARKER.to_owned(),
            channels: DEFAULT_CHANNELS.iter().map(|&c| c.to_owned()).collect(),
        }
    }
}

impl AcquisitionParser {
    /// A parser with the default marker and channel vocabulary.
    pub fn new() -> Self {
        AcquisitionParser::default()
    }

    /// A parser with a custom marker and channel vocabulary.
    pub fn with_vocabulary(marker: impl Into<String>, channels: Vec<String>) -> Self {
        AcquisitionParser {
            marker: marker.into(),
            channels,
        }
    }
}

impl FilenameParser for AcquisitionParser {
    fn parse(&self, path: &Path, dataset_type: &str) -> Result<RawFields, ParseFailure> {
        let name = file_name(path)?;
        let trimmed = name.trim_start_matches('_');

        let (head, tail) =
            trimmed
                .split_once(&self.marker)
                .ok_or_else(|| ParseFailure::Malformed {
                    file: name.to_owned(),
                    reason: format!("missing acquisition marker {:?}", self.marker),
                })?;

        // Collapse repeated underscores by dropping empty tokens.
        let mut tokens: Vec<&str> = head.split('_').filter(|token| !token.is_empty()).collect();

        let acq_id: u32 = match tokens.pop() {
            Some(last) if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) => {
                last.parse()
                    .map_err(|_| ParseFailure::MissingAcquisitionId {
                        file: name.to_owned(),
                    })?
            }
            _ => {
                return Err(ParseFailure::MissingAcquisitionId {
                    file: name.to_owned(),
                })
            }
        };

        let mut channel = None;
        tokens.retain(|token| {
            if self.channels.iter().any(|known| known == token) {
                channel.get_or_insert_with(|| (*token).to_owned());
                false
            } else {
                true
            }
        });

        let prefix = tokens.join("_");
        if prefix.is_empty() {
            return Err(ParseFailure::Malformed {
                file: name.to_owned(),
                reason: "no prefix remains before the acquisition number".to_owned(),
            });
        }

        let mut raw = RawFields::new(prefix, acq_id, dataset_type);
        raw.channel = channel;
        raw.position = extract_position(tail);
        raw.slice = extract_tagged_number(tail, "Slice");

        Ok(raw)
    }
}

/// Scan a filename suffix for `Pos_<iii>_<jjj>` or `Pos<n>` fragments.
fn extract_position(tail: &str) -> Option<PositionId> {
    let index = tail.find("Pos")?;
    let rest = &tail[index + "Pos".len()..];

    if let Some(two) = rest.strip_prefix('_') {
        if let Some((x, after_x)) = take_digits(two) {
            if let Some((y, _)) = after_x.strip_prefix('_').and_then(take_digits) {
                return Some(PositionId::Two(x, y));
            }
        }
    }
    take_digits(rest).map(|(n, _)| PositionId::One(n))
}

/// Scan a filename suffix for `<tag><digits>`.
fn extract_tagged_number(tail: &str, tag: &str) -> Option<u32> {
    let index = tail.find(tag)?;
    take_digits(&tail[index + tag.len()..]).map(|(n, _)| n)
}

/// Split a leading digit run off a string.
fn take_digits(s: &str) -> Option<(u32, &str)> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    s[..end].parse().ok().map(|n| (n, &s[end..]))
}
