//! # Payload Values
//!
//! In-memory payload shapes for the dataset types the store understands,
//! plus the [`PayloadCodec`] trait that turns them into container bytes:
//!
//! - [`Table`]: tabular rows for localization-like types
//! - [`ImageData`]: a flat numeric array with a shape, for image-like types
//! - mapping payloads (`serde_json::Map`) for metadata-like types
//!
//! Codecs are referenced by type contracts in the
//! [`registry`](crate::registry) and invoked by the store; the byte formats
//! (CSV for tables, JSON for mappings and images) are implementation
//! details of the shipped contracts, not of the store itself.


use serde::{Deserialize, Serialize};

/// A JSON-serializable attribute or metadata mapping.
pub type Mapping = serde_json::Map<String, serde_json::Value>;

/// The shape of a payload, declared by each type contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Tabular rows of named numeric columns.
    Table,
    /// A multi-dimensional numeric array.
    Image,
    /// A JSON-like key/value mapping.
    Mapping,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PayloadKind::Table => "table",
            PayloadKind::Image => "image",
            PayloadKind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

/// Tabular payload: named columns over rows of numeric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Rows; every row has one value per column.
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    /// An empty table with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Check that every row matches the column count.
    pub fn validate(&self) -> Result<(), PayloadError> {
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(PayloadError::Malformed(format!(
                    "row {index} has {} values but the table has {} columns",
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

/// Image payload: a flat sample buffer in row-major order plus its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// Dimension sizes, outermost first.
    pub shape: Vec<usize>,
    /// Row-major samples; length equals the product of `shape`.
    pub samples: Vec<f64>,
}

impl ImageData {
    /// Check that the sample count matches the declared shape.
    pub fn validate(&self) -> Result<(), PayloadError> {
        let expected: usize = self.shape.iter().product();
        if self.samples.len() != expected {
            return Err(PayloadError::Malformed(format!(
                "image declares shape {:?} ({expected} samples) but holds {}",
                self.shape,
                self.samples.len()
            )));
        }
        Ok(())
    }
}

/// One dataset's in-memory payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Tabular rows.
    Table(Table),
    /// A numeric array.
    Image(ImageData),
    /// A key/value mapping.
    Mapping(Mapping),
}

impl Payload {
    /// The kind of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Table(_) => PayloadKind::Table,
            Payload::Image(_) => PayloadKind::Image,
            Payload::Mapping(_) => PayloadKind::Mapping,
        }
    }
}

/// Errors from payload serialization and deserialization.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The payload's kind does not match the contract's codec.
    #[error("expected a {expected} payload, got a {got} payload")]
    WrongKind {
        /// Kind the codec serializes.
        expected: PayloadKind,
        /// Kind that was passed in.
        got: PayloadKind,
    },

    /// CSV encode/decode error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally invalid payload bytes or values.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Byte codec for one payload kind.
///
/// Implementations must be pure: `deserialize(serialize(p)) == p` for every
/// payload of the codec's kind.
pub trait PayloadCodec: Send + Sync {
    /// The payload kind this codec handles.
    fn kind(&self) -> PayloadKind;

    /// Serialize a payload of the matching kind to container bytes.
    fn serialize(&self, payload: &Payload) -> Result<Vec<u8>, PayloadError>;

    /// Deserialize container bytes back into a payload.
    fn deserialize(&self, bytes: &[u8]) -> Result<Payload, PayloadError>;
}

/// CSV codec for [`Table`] payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTableCodec;

impl PayloadCodec for CsvTableCodec {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Table
    }

    fn serialize(&self, payload: &Payload) -> Result<Vec<u8>, PayloadError> {
        let table = match payload {
            Payload::Table(table) => table,
            other => {
                return Err(PayloadError::WrongKind {
                    expected: PayloadKind::Table,
                    got: other.kind(),
                })
            }
        };
        table.validate()?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row.iter().map(|value| value.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|err| PayloadError::Malformed(err.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Payload, PayloadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(str::to_owned)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = Vec::with_capacity(columns.len());
            for field in record.iter() {
                let value: f64 = field.parse().map_err(|_| {
                    PayloadError::Malformed(format!("non-numeric table cell {field:?}"))
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        let table = Table { columns, rows };
        table.validate()?;
        Ok(Payload::Table(table))
    }
}

/// JSON codec for mapping payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMappingCodec;

impl PayloadCodec for JsonMappingCodec {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Mapping
    }

    fn serialize(&self, payload: &Payload) -> Result<Vec<u8>, PayloadError> {
        let mapping = match payload {
            Payload::Mapping(mapping) => mapping,
            other => {
                return Err(PayloadError::WrongKind {
                    expected: PayloadKind::Mapping,
                    got: other.kind(),
                })
            }
        };
        Ok(serde_json::to_vec_pretty(mapping)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Payload, PayloadError> {
        Ok(Payload::Mapping(serde_json::from_slice(bytes)?))
    }
}

/// JSON codec for [`ImageData`] payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonImageCodec;

impl PayloadCodec for JsonImageCodec {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Image
    }

    fn serialize(&self, payload: &Payload) -> Result<Vec<u8>, PayloadError> {
        let image = match payload {
            Payload::Image(image) => image,
            other => {
                return Err(PayloadError::WrongKind {
                    expected: PayloadKind::Image,
                    got: other.kind(),
                })
            }
        };
        image.validate()?;
        Ok(serde_json::to_vec(image)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Payload, PayloadError> {
        let image: ImageData = serde_json::from_slice(bytes)?;
        image.validate()?;
        Ok(Payload::Image(image))
    }
}
