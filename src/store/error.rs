use std::time::Duration;

use crate::identifier::ValidationError;
use crate::payload::PayloadError;
use crate::registry::UnknownDatasetType;

/// Errors from the container backend: I/O, locking and corruption.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error from the underlying container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container lock could not be acquired before the deadline.
    #[error("could not acquire {mode} container lock within {timeout:?}")]
    LockTimeout {
        /// `"shared"` or `"exclusive"`.
        mode: &'static str,
        /// The configured acquisition timeout.
        timeout: Duration,
    },

    /// A container entry exists but its contents are unreadable.
    #[error("corrupt container entry at {key:?}: {reason}")]
    Corrupt {
        /// The affected key.
        key: String,
        /// What was wrong with the entry.
        reason: String,
    },

    /// An operation addressed a key with no entry behind it.
    #[error("no container entry at {key:?}")]
    MissingEntry {
        /// The affected key.
        key: String,
    },
}

/// Errors surfaced by datastore operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identifier failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The identifier references an unregistered dataset type.
    #[error(transparent)]
    UnknownType(#[from] UnknownDatasetType),

    /// Payload serialization or deserialization failed.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// A valid identifier with no payload behind it.
    #[error("no dataset at key {key:?}")]
    NotFound {
        /// The encoded key that was probed.
        key: String,
    },

    /// A metadata dataset was addressed at a key holding no described
    /// dataset to attach to.
    #[error("cannot attach {dataset_type:?} metadata: no dataset exists at key {key:?}")]
    DescribedDatasetMissing {
        /// The describing (metadata) type.
        dataset_type: String,
        /// The key of the absent described dataset.
        key: String,
    },

    /// User attribute names must not collide with the store's reserved
    /// identifier attributes.
    #[error("attribute name {name:?} collides with the reserved attribute namespace")]
    ReservedAttribute {
        /// The offending attribute name.
        name: String,
    },

    /// Backend I/O or lock failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
