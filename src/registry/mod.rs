//! # Dataset Type Registry
//!
//! A [`TypeRegistry`] maps dataset type names to their behavioral contract:
//! whether a type acts as metadata describing another type, and which
//! [`PayloadCodec`] serializes its payload. Only registered names may
//! appear as a `dataset_type` or `describes` field of an identifier, and
//! decoding a key that references an unregistered name fails with
//! [`UnknownDatasetType`].
//!
//! The registry is an explicit value passed into the components that need
//! it (key decoding, the datastore) rather than process-wide state.
//! Registration happens once, while a store is being configured; the core
//! never mutates a registry during a build or query. Third-party dataset
//! types participate by registering a [`TypeContract`] with their own
//! codec at startup.


use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::payload::{
    CsvTableCodec, JsonImageCodec, JsonMappingCodec, PayloadCodec, PayloadKind,
};

/// Built-in type name for localization result tables.
pub const LOCALIZATIONS: &str = "Localizations";
/// Built-in type name for metadata describing localization tables.
pub const LOC_METADATA: &str = "LocMetadata";
/// Built-in type name for widefield images.
pub const WIDEFIELD_IMAGE: &str = "WidefieldImage";
/// Built-in type name for fiducial track tables.
pub const FIDUCIAL_TRACKS: &str = "FiducialTracks";

/// Error for names absent from the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dataset type {name:?} is not registered")]
pub struct UnknownDatasetType {
    /// The name that was looked up.
    pub name: String,
}

/// Errors raised at registration time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Type names become key leaf tokens, so separator characters and
    /// empty names are rejected.
    #[error("invalid dataset type name {name:?}: {reason}")]
    InvalidTypeName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// The behavioral contract of one dataset type.
#[derive(Clone)]
pub struct TypeContract {
    name: String,
    describes: Option<String>,
    codec: Arc<dyn PayloadCodec>,
}

impl TypeContract {
    /// Contract for a plain dataset type.
    pub fn new(name: impl Into<String>, codec: Arc<dyn PayloadCodec>) -> Self {
        TypeContract {
            name: name.into(),
            describes: None,
            codec,
        }
    }

    /// Contract for a type whose instances are metadata describing
    /// datasets of `target`.
    pub fn describing(
        name: impl Into<String>,
        target: impl Into<String>,
        codec: Arc<dyn PayloadCodec>,
    ) -> Self {
        TypeContract {
            name: name.into(),
            describes: Some(target.into()),
            codec,
        }
    }

    /// The registered type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type this contract describes, when it acts as metadata.
    pub fn describes(&self) -> Option<&str> {
        self.describes.as_deref()
    }

    /// The payload kind instances of this type carry.
    pub fn payload_kind(&self) -> PayloadKind {
        self.codec.kind()
    }

    /// The payload codec for this type.
    pub fn codec(&self) -> &Arc<dyn PayloadCodec> {
        &self.codec
    }
}

impl fmt::Debug for TypeContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeContract")
            .field("name", &self.name)
            .field("describes", &self.describes)
            .field("payload_kind", &self.codec.kind())
            .finish()
    }
}

/// A read-only-after-construction mapping from type names to contracts.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    contracts: BTreeMap<String, TypeContract>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// A registry pre-populated with the built-in SMLM dataset types:
    /// `Localizations`, `LocMetadata` (describing `Localizations`),
    /// `WidefieldImage` and `FiducialTracks`.
    pub fn with_builtin_types() -> Self {
        let mut registry = TypeRegistry::new();
        registry
            .register(TypeContract::new(LOCALIZATIONS, Arc::new(CsvTableCodec)))
            .expect("built-in type name is valid");
        registry
            .register(TypeContract::describing(
                LOC_METADATA,
                LOCALIZATIONS,
                Arc::new(JsonMappingCodec),
            ))
            .expect("built-in type name is valid");
        registry
            .register(TypeContract::new(WIDEFIELD_IMAGE, Arc::new(JsonImageCodec)))
            .expect("built-in type name is valid");
        registry
            .register(TypeContract::new(FIDUCIAL_TRACKS, Arc::new(CsvTableCodec)))
            .expect("built-in type name is valid");
        registry
    }

    /// Register a contract. Re-registering a name replaces the previous
    /// contract.
    pub fn register(&mut self, contract: TypeContract) -> Result<(), RegistryError> {
        let name = contract.name();
        if name.is_empty() {
            return Err(RegistryError::InvalidTypeName {
                name: name.to_owned(),
                reason: "name must not be empty".to_owned(),
            });
        }
        if let Some(reserved) = name.chars().find(|c| matches!(c, '/' | '_')) {
            return Err(RegistryError::InvalidTypeName {
                name: name.to_owned(),
                reason: format!("name must not contain {reserved:?}"),
            });
        }
        self.contracts.insert(name.to_owned(), contract);
        Ok(())
    }

    /// Whether a name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Look up the contract for a name.
    pub fn contract_for(&self, name: &str) -> Result<&TypeContract, UnknownDatasetType> {
        self.contracts.get(name).ok_or_else(|| UnknownDatasetType {
            name: name.to_owned(),
        })
    }

    /// All registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// All contracts whose instances describe other types.
    pub fn describing_contracts(&self) -> impl Iterator<Item = &TypeContract> {
        self.contracts
            .values()
            .filter(|contract| contract.describes().is_some())
    }
}
