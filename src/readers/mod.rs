//! # Payload Readers
//!
//! Adapters that load a source file from disk into the in-memory
//! [`Payload`] shape a type contract expects: CSV files for tabular
//! contracts and JSON files for mapping contracts. Image payloads can be
//! stored and fetched through the API, but no image file format decoding
//! ships with this crate.

#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::payload::{Payload, PayloadKind, Table};
use crate::registry::TypeContract;

/// Errors raised while loading a payload source file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// I/O error opening or reading the file.
    #[error("I/O error reading {file:?}: {source}")]
    Io {
        /// The offending file.
        file: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV rows did not form a numeric table.
    #[error("CSV error in {file:?}: {reason}")]
    Csv {
        /// The offending file.
        file: String,
        /// What was wrong.
        reason: String,
    },

    /// The JSON file did not hold an object.
    #[error("JSON error in {file:?}: {reason}")]
    Json {
        /// The offending file.
        file: String,
        /// What was wrong.
        reason: String,
    },

    /// No reader ships for this payload kind.
    #[error("no reader is available for {kind} payloads (file {file:?})")]
    Unsupported {
        /// The contract's payload kind.
        kind: PayloadKind,
        /// The candidate file.
        file: String,
    },
}

/// Load a file into the payload shape declared by a contract.
pub fn read_payload(path: &Path, contract: &TypeContract) -> Result<Payload, ReadError> {
    match contract.payload_kind() {
        PayloadKind::Table => read_table(path).map(Payload::Table),
        PayloadKind::Mapping => read_mapping(path).map(Payload::Mapping),
        kind => Err(ReadError::Unsupported {
            kind,
            file: path.display().to_string(),
        }),
    }
}

fn read_table(path: &Path) -> Result<Table, ReadError> {
    let file = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|err| ReadError::Csv {
        file: file.clone(),
        reason: err.to_string(),
    })?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|err| ReadError::Csv {
            file: file.clone(),
            reason: err.to_string(),
        })?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| ReadError::Csv {
            file: file.clone(),
            reason: err.to_string(),
        })?;
        let mut row = Vec::with_capacity(columns.len());
        for field in record.iter() {
            let value: f64 = field.parse().map_err(|_| ReadError::Csv {
                file: file.clone(),
                reason: format!("non-numeric cell {field:?}"),
            })?;
            row.push(value);
        }
        if row.len() != columns.len() {
            return Err(ReadError::Csv {
                file: file.clone(),
                reason: format!(
                    "row has {} values but the header has {} columns",
                    row.len(),
                    columns.len()
                ),
            });
        }
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

fn read_mapping(path: &Path) -> Result<crate::payload::Mapping, ReadError> {
    let file = path.display().to_string();
    let handle = File::open(path).map_err(|source| ReadError::Io {
        file: file.clone(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_reader(BufReader::new(handle)).map_err(|err| ReadError::Json {
            file: file.clone(),
            reason: err.to_string(),
        })?;
    match value {
        serde_json::Value::Object(mapping) => Ok(mapping),
        other => Err(ReadError::Json {
            file,
            reason: format!("expected a JSON object, found {other}"),
        }),
    }
}
