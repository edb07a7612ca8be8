//! # locstore - A Datastore for Localization Microscopy Datasets
//!
//! `locstore` manages heterogeneous single-molecule localization microscopy
//! (SMLM) datasets inside one hierarchical container. Its core is a dataset
//! identity and storage-key engine: every dataset gets a canonical,
//! structured identifier, every identifier maps bidirectionally to a
//! physical key inside the container, and the whole index is recoverable
//! purely from the container's layout.
//!
//! ## Key Features
//!
//! - **Structured Identity**: Datasets are addressed by a
//!   [`DatasetId`](identifier::DatasetId) holding a prefix, an acquisition
//!   number and a dataset type, plus optional channel, date, position,
//!   slice and replicate fields, with a stable total order and per-store
//!   uniqueness.
//!
//! - **Invertible Keys**: The [key codec](key) turns identifiers into
//!   hierarchical keys like
//!   `HeLaL_Control/HeLaL_Control_1/Localizations_ChannelA647_Pos0` and
//!   parses such keys back, so a container is self-describing.
//!
//! - **Extensible Types**: A [`TypeRegistry`](registry::TypeRegistry)
//!   carries each dataset type's contract, including metadata types that
//!   describe other types; third-party types bring their own payload
//!   codecs.
//!
//! - **Recoverable Index**: The [`Datastore`](store::Datastore) keeps no
//!   catalog file; queries re-derive every identifier from the container's
//!   keys and attributes.
//!
//! - **Fault-Isolated Builds**: The [build orchestrator](build) walks an
//!   acquisition directory, parses filenames and registers datasets on a
//!   worker pool; one bad file is reported, never fatal.
//!
//! ## Quick Start
//!
//! ```rust
//! use locstore::identifier::{DatasetId, PositionId};
//! use locstore::payload::{Payload, Table};
//! use locstore::registry::TypeRegistry;
//! use locstore::store::{Datastore, MemoryBackend};
//!
//! let registry = TypeRegistry::with_builtin_types();
//! let store = Datastore::new(MemoryBackend::new(), registry);
//!
//! let id = DatasetId::builder("HeLaL_Control", 1, "Localizations")
//!     .channel("A647")
//!     .position(PositionId::One(0))
//!     .build(store.registry())?;
//!
//! let mut table = Table::new(vec!["x".into(), "y".into()]);
//! table.rows.push(vec![210.4, 90.2]);
//! store.put(&id, Payload::Table(table), None)?;
//!
//! let ids = store.query(|_| true)?;
//! assert_eq!(ids, vec![id]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`identifier`]: the `DatasetId` value type, validation and ordering
//! - [`key`]: the bidirectional identifier/key codec
//! - [`registry`]: dataset type contracts
//! - [`payload`]: payload value types and byte codecs
//! - [`store`]: the datastore index and container backends
//! - [`parse`]: filename parsers producing raw identifier fields
//! - [`readers`]: file-to-payload readers
//! - [`build`]: the directory build orchestrator

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod build;
pub mod identifier;
pub mod key;
pub mod parse;
pub mod payload;
pub mod readers;
pub mod registry;
pub mod store;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::build::{build, BuildFailure, BuildOptions, BuildReport, ExtensionRule};
    pub use crate::identifier::{
        DatasetId, DatasetIdBuilder, PositionId, RawFields, ValidationError,
    };
    pub use crate::key::{decode, encode, KeyParseError};
    pub use crate::parse::{AcquisitionParser, FilenameParser, ParseFailure, SimpleParser};
    pub use crate::payload::{ImageData, Mapping, Payload, PayloadCodec, PayloadKind, Table};
    pub use crate::readers::{read_payload, ReadError};
    pub use crate::registry::{TypeContract, TypeRegistry, UnknownDatasetType};
    pub use crate::store::{
        ContainerBackend, Datastore, DirectoryBackend, MemoryBackend, StorageError, StoreError,
    };
}
