use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod build;
mod config;
mod delete;
mod get;
mod info;
mod query;

/// locstore - Localization Microscopy Datastore
#[derive(Parser)]
#[command(name = "locstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Filename parser used to derive identifiers during a build.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ParserArg {
    /// `prefix_acqID.<ext>` filenames
    Simple,
    /// Acquisition-software filenames with an `_MMStack_` marker
    #[default]
    Acquisition,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or rebuild) a datastore from a directory of acquisition files
    Build {
        /// Datastore container directory
        #[arg(value_name = "STORE")]
        store: PathBuf,

        /// Root directory to scan for acquisition files
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Filename parser (simple, acquisition)
        #[arg(short = 'p', long, default_value = "acquisition", value_enum)]
        parser: ParserArg,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Worker threads for the parse/read stage
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Parse and validate without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Display summary information about a datastore
    Info {
        /// Datastore container directory
        #[arg(value_name = "STORE")]
        store: PathBuf,
    },

    /// List dataset identifiers matching optional filters
    Query {
        /// Datastore container directory
        #[arg(value_name = "STORE")]
        store: PathBuf,

        /// Only list datasets of this type
        #[arg(short = 't', long, value_name = "TYPE")]
        dataset_type: Option<String>,

        /// Only list datasets with this prefix
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,

        /// Only list datasets with this acquisition number
        #[arg(long, value_name = "N")]
        acq_id: Option<u32>,
    },

    /// Print the payload stored under a key
    Get {
        /// Datastore container directory
        #[arg(value_name = "STORE")]
        store: PathBuf,

        /// Dataset key, e.g. HeLaL_Control/HeLaL_Control_1/Localizations
        #[arg(value_name = "KEY")]
        key: String,

        /// Fetch the describing (metadata) dataset attached to the key
        #[arg(long, value_name = "TYPE")]
        metadata: Option<String>,
    },

    /// Delete the dataset stored under a key
    Delete {
        /// Datastore container directory
        #[arg(value_name = "STORE")]
        store: PathBuf,

        /// Dataset key
        #[arg(value_name = "KEY")]
        key: String,

        /// Delete the describing (metadata) dataset attached to the key
        #[arg(long, value_name = "TYPE")]
        metadata: Option<String>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            store,
            input,
            parser,
            config,
            workers,
            dry_run,
        } => build::run(store, input, parser, config, workers, dry_run),
        Commands::Info { store } => info::run(store),
        Commands::Query {
            store,
            dataset_type,
            prefix,
            acq_id,
        } => query::run(store, dataset_type, prefix, acq_id),
        Commands::Get {
            store,
            key,
            metadata,
        } => get::run(store, key, metadata),
        Commands::Delete {
            store,
            key,
            metadata,
        } => delete::run(store, key, metadata),
    }
}

/// Open the datastore at `path` with the built-in type registry.
fn open_store(
    path: &std::path::Path,
) -> Result<locstore::store::Datastore<locstore::store::DirectoryBackend>> {
    use anyhow::Context;
    use locstore::registry::TypeRegistry;
    use locstore::store::{Datastore, DirectoryBackend};

    let backend = DirectoryBackend::open(path)
        .with_context(|| format!("failed to open container at {}", path.display()))?;
    Ok(Datastore::new(backend, TypeRegistry::with_builtin_types()))
}

/// Resolve a key plus optional `--metadata TYPE` flag into an identifier.
fn resolve_id(
    store: &locstore::store::Datastore<locstore::store::DirectoryBackend>,
    key: &str,
    metadata: Option<&str>,
) -> Result<locstore::identifier::DatasetId> {
    use anyhow::Context;

    let id = locstore::key::decode(key, store.registry())
        .with_context(|| format!("failed to parse key {key:?}"))?;
    match metadata {
        None => Ok(id),
        Some(describing) => {
            use chrono::Datelike;

            let raw = locstore::identifier::RawFields {
                prefix: id.prefix().to_owned(),
                acq_id: id.acq_id(),
                dataset_type: describing.to_owned(),
                describes: None,
                channel: id.channel().map(str::to_owned),
                date: id.date().map(|d| (d.year(), d.month(), d.day())),
                position: id.position(),
                slice: id.slice(),
                replicate: id.replicate(),
            };
            locstore::identifier::DatasetId::from_raw(raw, store.registry())
                .with_context(|| format!("{describing:?} is not a valid describing type"))
        }
    }
}
