//! # Datastore Index
//!
//! [`Datastore`] owns the authoritative set of (identifier → physical key)
//! entries inside one container. It keeps no catalog of its own: the
//! container's layout is the sole durable record, and the index is always
//! re-derivable by enumerating container keys and decoding each one with
//! the [key codec](crate::key).
//!
//! ## Operations
//!
//! - [`put`](Datastore::put): validate, encode, persist payload plus
//!   attribute sidecar as one atomic unit. Re-putting the same identifier
//!   overwrites (last-write-wins), which makes rebuilds idempotent.
//! - [`get`](Datastore::get): fetch a payload, [`StoreError::NotFound`]
//!   when absent.
//! - [`query`](Datastore::query): enumerate, decode (logging and skipping
//!   foreign keys), filter, and return identifiers in canonical order.
//! - [`delete`](Datastore::delete): remove payload and attributes,
//!   reporting whether anything existed.
//!
//! Types that describe other types (metadata) are stored in the attribute
//! side channel of the described dataset's key, never under a key of their
//! own; `query` reconstructs their identifiers from a reserved attribute
//! marker.
//!
//! ## Locking
//!
//! One logical operation holds the container lock for its whole duration:
//! exclusive for writes, shared for reads. The lock has two layers under
//! one deadline — an in-process reader/writer lock over this store's
//! threads, and the backend's advisory lock excluding other handles on
//! the same container (other processes included). Acquisition times out
//! with [`StorageError::LockTimeout`] instead of blocking indefinitely.

mod backend;
mod error;
mod lock;

#[cfg(test)]
mod tests;

pub use backend::{
    enumerate_entry_keys, BackendLock, Child, ChildKind, ContainerBackend, DirectoryBackend,
    MemoryBackend,
};
pub use error::{StorageError, StoreError};

use std::sync::{RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::identifier::{DatasetId, PositionId};
use crate::key;
use crate::payload::{Mapping, Payload};
use crate::registry::TypeRegistry;

/// Prefix of reserved attributes recording the identifier fields.
pub const ID_ATTR_PREFIX: &str = "SMLM_";
/// Prefix of attributes holding a describing (metadata) dataset's mapping.
pub const METADATA_ATTR_PREFIX: &str = "SMLM_Metadata_";
/// Marker attribute recording which describing type owns the metadata
/// attributes of an entry.
const METADATA_TYPE_MARKER: &str = "SMLM_Metadata_SMLM_datasetType";
/// Reserved attribute recording the store format version.
const VERSION_ATTR: &str = "SMLM_Version";

/// On-disk layout version written into every entry's attributes.
pub const STORE_FORMAT_VERSION: &str = "1";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Guards for one logical operation: the in-process lock plus the
/// backend's advisory lock, both held for the operation's duration.
struct OpGuard<G> {
    _thread: G,
    _backend: Box<dyn BackendLock>,
}

/// The datastore index over one container backend.
pub struct Datastore<B: ContainerBackend> {
    backend: B,
    registry: TypeRegistry,
    lock: lock::StoreLock,
    lock_timeout: Duration,
}

impl<B: ContainerBackend> Datastore<B> {
    /// Open a datastore over a backend with the given type registry.
    pub fn new(backend: B, registry: TypeRegistry) -> Self {
        Datastore {
            backend,
            registry,
            lock: lock::StoreLock::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Replace the lock acquisition timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// The registry this store consults.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock_shared(&self) -> Result<OpGuard<RwLockReadGuard<'_, ()>>, StorageError> {
        let deadline = Instant::now() + self.lock_timeout;
        let thread = self.lock.shared(self.lock_timeout)?;
        let backend = lock::acquire_backend(&self.backend, false, deadline, self.lock_timeout)?;
        Ok(OpGuard {
            _thread: thread,
            _backend: backend,
        })
    }

    fn lock_exclusive(&self) -> Result<OpGuard<RwLockWriteGuard<'_, ()>>, StorageError> {
        let deadline = Instant::now() + self.lock_timeout;
        let thread = self.lock.exclusive(self.lock_timeout)?;
        let backend = lock::acquire_backend(&self.backend, true, deadline, self.lock_timeout)?;
        Ok(OpGuard {
            _thread: thread,
            _backend: backend,
        })
    }

    /// Insert or overwrite one dataset.
    ///
    /// The identifier is re-validated against this store's registry, its
    /// key derived by the codec, and payload plus attributes written as
    /// one atomic unit. `attributes` is merged as sidecar metadata; its
    /// names must not enter the reserved `SMLM_` namespace.
    pub fn put(
        &self,
        id: &DatasetId,
        payload: Payload,
        attributes: Option<Mapping>,
    ) -> Result<(), StoreError> {
        let contract = self.registry.contract_for(id.dataset_type())?;
        let key = key::encode(id);

        if let Some(attrs) = attributes.as_ref() {
            if let Some(name) = attrs.keys().find(|name| name.starts_with(ID_ATTR_PREFIX)) {
                return Err(StoreError::ReservedAttribute {
                    name: name.clone(),
                });
            }
        }

        let _guard = self.lock_exclusive()?;

        if id.describes().is_some() {
            // Metadata datasets attach to the described entry's attribute
            // side channel instead of occupying a key of their own.
            let mapping = match payload {
                Payload::Mapping(mapping) => mapping,
                other => {
                    return Err(crate::payload::PayloadError::WrongKind {
                        expected: crate::payload::PayloadKind::Mapping,
                        got: other.kind(),
                    }
                    .into())
                }
            };
            let mut attrs = self.backend.read_attrs(&key)?.ok_or_else(|| {
                StoreError::DescribedDatasetMissing {
                    dataset_type: id.dataset_type().to_owned(),
                    key: key.clone(),
                }
            })?;
            attrs.retain(|name, _| !name.starts_with(METADATA_ATTR_PREFIX));
            for (name, value) in mapping {
                attrs.insert(format!("{METADATA_ATTR_PREFIX}{name}"), value);
            }
            attrs.insert(
                METADATA_TYPE_MARKER.to_owned(),
                Value::String(id.dataset_type().to_owned()),
            );
            if let Some(user) = attributes {
                for (name, value) in user {
                    attrs.insert(name, value);
                }
            }
            self.backend.write_attrs(&key, &attrs)?;
            return Ok(());
        }

        let bytes = contract.codec().serialize(&payload)?;
        let mut attrs = attributes.unwrap_or_default();
        write_id_attrs(&mut attrs, id);
        self.backend.write_entry(&key, &bytes, &attrs)?;
        Ok(())
    }

    /// Fetch the payload stored for an identifier.
    pub fn get(&self, id: &DatasetId) -> Result<Payload, StoreError> {
        let contract = self.registry.contract_for(id.dataset_type())?;
        let key = key::encode(id);

        let _guard = self.lock_shared()?;

        if id.describes().is_some() {
            let attrs = self
                .backend
                .read_attrs(&key)?
                .filter(|attrs| attrs.contains_key(METADATA_TYPE_MARKER))
                .ok_or(StoreError::NotFound { key })?;
            let mut mapping = Mapping::new();
            for (name, value) in attrs {
                if name == METADATA_TYPE_MARKER {
                    continue;
                }
                if let Some(stripped) = name.strip_prefix(METADATA_ATTR_PREFIX) {
                    mapping.insert(stripped.to_owned(), value);
                }
            }
            return Ok(Payload::Mapping(mapping));
        }

        let bytes = self
            .backend
            .read_payload(&key)?
            .ok_or(StoreError::NotFound { key })?;
        Ok(contract.codec().deserialize(&bytes)?)
    }

    /// The user attributes attached to an identifier's entry, with the
    /// store's reserved attributes filtered out.
    pub fn attributes(&self, id: &DatasetId) -> Result<Mapping, StoreError> {
        self.registry.contract_for(id.dataset_type())?;
        let key = key::encode(id);

        let _guard = self.lock_shared()?;

        let attrs = self
            .backend
            .read_attrs(&key)?
            .ok_or(StoreError::NotFound { key })?;
        Ok(attrs
            .into_iter()
            .filter(|(name, _)| !name.starts_with(ID_ATTR_PREFIX))
            .collect())
    }

    /// Whether a dataset exists for this identifier.
    pub fn contains(&self, id: &DatasetId) -> Result<bool, StoreError> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Remove a dataset's payload and attributes. Returns whether anything
    /// existed.
    pub fn delete(&self, id: &DatasetId) -> Result<bool, StoreError> {
        self.registry.contract_for(id.dataset_type())?;
        let key = key::encode(id);

        let _guard = self.lock_exclusive()?;

        if id.describes().is_some() {
            let Some(mut attrs) = self.backend.read_attrs(&key)? else {
                return Ok(false);
            };
            let before = attrs.len();
            attrs.retain(|name, _| !name.starts_with(METADATA_ATTR_PREFIX));
            if attrs.len() == before {
                return Ok(false);
            }
            self.backend.write_attrs(&key, &attrs)?;
            return Ok(true);
        }

        Ok(self.backend.remove_entry(&key)?)
    }

    /// Enumerate all identifiers matching a predicate, in canonical order.
    ///
    /// Keys the codec cannot decode (for example keys written by unrelated
    /// tools) are logged and skipped, never failed on. The result is a
    /// fresh snapshot: re-invoking `query` re-enumerates the container.
    pub fn query<F>(&self, mut predicate: F) -> Result<Vec<DatasetId>, StoreError>
    where
        F: FnMut(&DatasetId) -> bool,
    {
        let _guard = self.lock_shared()?;

        let mut ids = Vec::new();
        for key in enumerate_entry_keys(&self.backend)? {
            let id = match key::decode(&key, &self.registry) {
                Ok(id) => id,
                Err(err) => {
                    log::warn!("skipping undecodable key {key:?}: {err}");
                    continue;
                }
            };

            // A metadata marker in the attributes means a describing
            // dataset also lives at this key.
            if let Some(attrs) = self.backend.read_attrs(&key)? {
                if let Some(Value::String(describing)) = attrs.get(METADATA_TYPE_MARKER) {
                    match self.describing_id(&id, describing) {
                        Some(meta_id) => {
                            if predicate(&meta_id) {
                                ids.push(meta_id);
                            }
                        }
                        None => log::warn!(
                            "skipping metadata marker {describing:?} at key {key:?}: \
                             not a registered describing type for {:?}",
                            id.dataset_type()
                        ),
                    }
                }
            }

            if predicate(&id) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Enumerate all identifiers of one dataset type, in canonical order.
    pub fn query_type(&self, dataset_type: &str) -> Result<Vec<DatasetId>, StoreError> {
        self.registry.contract_for(dataset_type)?;
        self.query(|id| id.dataset_type() == dataset_type)
    }

    /// Rebuild a describing identifier from a decoded base identifier and
    /// the marker's type name.
    fn describing_id(&self, base: &DatasetId, describing: &str) -> Option<DatasetId> {
        let contract = self.registry.contract_for(describing).ok()?;
        if contract.describes() != Some(base.dataset_type()) {
            return None;
        }
        Some(DatasetId::from_decoded_parts(
            base.prefix().to_owned(),
            base.acq_id(),
            describing.to_owned(),
            Some(base.dataset_type().to_owned()),
            base.channel().map(str::to_owned),
            base.date(),
            base.position(),
            base.slice(),
            base.replicate(),
        ))
    }
}

/// Record the identifier fields as reserved attributes so the container is
/// inspectable by foreign tools without the codec.
fn write_id_attrs(attrs: &mut Mapping, id: &DatasetId) {
    attrs.insert(format!("{ID_ATTR_PREFIX}prefix"), json!(id.prefix()));
    attrs.insert(format!("{ID_ATTR_PREFIX}acqID"), json!(id.acq_id()));
    attrs.insert(
        format!("{ID_ATTR_PREFIX}datasetType"),
        json!(id.dataset_type()),
    );
    attrs.insert(format!("{ID_ATTR_PREFIX}channelID"), json!(id.channel()));
    attrs.insert(
        format!("{ID_ATTR_PREFIX}dateID"),
        json!(id.date().map(|date| date.to_string())),
    );
    attrs.insert(
        format!("{ID_ATTR_PREFIX}posID"),
        match id.position() {
            Some(PositionId::One(n)) => json!([n]),
            Some(PositionId::Two(x, y)) => json!([x, y]),
            None => Value::Null,
        },
    );
    attrs.insert(format!("{ID_ATTR_PREFIX}sliceID"), json!(id.slice()));
    attrs.insert(
        format!("{ID_ATTR_PREFIX}replicateID"),
        json!(id.replicate()),
    );
    attrs.insert(VERSION_ATTR.to_owned(), json!(STORE_FORMAT_VERSION));
}
