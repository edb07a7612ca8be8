//! # Build Orchestrator
//!
//! [`build`] populates a datastore from a directory tree of experimental
//! files: it walks the tree, matches candidate files to dataset types by
//! filename suffix, derives raw fields with a
//! [`FilenameParser`](crate::parse::FilenameParser), loads payloads with
//! the [readers](crate::readers), and registers each result with
//! [`Datastore::put`].
//!
//! Parsing and reading are pure, so they run on a bounded worker pool;
//! all `put` calls are funneled through the calling thread, respecting
//! the store's single-writer discipline. Every file is processed
//! independently: a parse, read or validation failure on one file is
//! recorded in the [`BuildReport`] and never aborts the run. Backend I/O
//! and lock failures do abort, since they indicate the container itself is
//! unhealthy.
//!
//! Types that describe other types are registered after all plain types in
//! the same run, so metadata always finds its described dataset.

mod report;


pub use report::{BuildFailure, BuildReport};

use std::path::{Path, PathBuf};

use crate::identifier::{DatasetId, RawFields};
use crate::parse::FilenameParser;
use crate::payload::Payload;
use crate::readers;
use crate::registry::TypeRegistry;
use crate::store::{ContainerBackend, Datastore, StoreError};

/// Errors that abort a whole build run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The root directory could not be traversed at all.
    #[error("failed to traverse {path:?}: {source}")]
    Walk {
        /// The root that was being walked.
        path: String,
        /// Underlying walker error.
        source: ignore::Error,
    },

    /// The container backend failed; the run cannot meaningfully continue.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maps a filename suffix to the dataset type its files hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRule {
    /// Filename suffix, e.g. `locResults.dat`.
    pub suffix: String,
    /// Registered dataset type name.
    pub dataset_type: String,
}

impl ExtensionRule {
    /// A rule mapping `suffix` to `dataset_type`.
    pub fn new(suffix: impl Into<String>, dataset_type: impl Into<String>) -> Self {
        ExtensionRule {
            suffix: suffix.into(),
            dataset_type: dataset_type.into(),
        }
    }
}

/// Settings for one build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Suffix-to-type rules; more specific (longer) suffixes win.
    pub extensions: Vec<ExtensionRule>,
    /// Worker threads for the parse/read stage.
    pub workers: usize,
    /// Parse and validate without writing anything to the store.
    pub dry_run: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            extensions: vec![
                ExtensionRule::new("locResults.dat", crate::registry::LOCALIZATIONS),
                ExtensionRule::new("locMetadata.json", crate::registry::LOC_METADATA),
                ExtensionRule::new("fiducialTracks.dat", crate::registry::FIDUCIAL_TRACKS),
            ],
            workers: 4,
            dry_run: false,
        }
    }
}

/// Populate a store from a directory tree. See the module docs.
pub fn build<B: ContainerBackend>(
    store: &Datastore<B>,
    parser: &dyn FilenameParser,
    root: &Path,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::default();
    let candidates = collect_candidates(store.registry(), root, options, &mut report)?;

    log::info!(
        "build: {} candidate files under {}",
        candidates.len(),
        root.display()
    );

    let workers = options.workers.max(1);
    let registry = store.registry();

    let mut slots: Vec<Option<ParseOutcome>> = Vec::new();
    slots.resize_with(candidates.len(), || None);

    std::thread::scope(|scope| {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, &Candidate)>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, candidate) in job_rx.iter() {
                    let outcome = parse_and_read(parser, registry, candidate);
                    if result_tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        for (index, candidate) in candidates.iter().enumerate() {
            let _ = job_tx.send((index, candidate));
        }
        drop(job_tx);

        for (index, outcome) in result_rx.iter() {
            slots[index] = Some(outcome);
        }
    });

    // Single-writer stage: validate and register in candidate order, so
    // described datasets land before the metadata that attaches to them.
    for (candidate, outcome) in candidates.iter().zip(slots) {
        let file = candidate.path.display().to_string();
        let (raw, payload) = match outcome.expect("worker reported every candidate") {
            Ok(parsed) => parsed,
            Err(reason) => {
                report.record_failure(file, reason);
                continue;
            }
        };

        let id = match DatasetId::from_raw(raw, registry) {
            Ok(id) => id,
            Err(err) => {
                report.record_failure(file, err.to_string());
                continue;
            }
        };

        if options.dry_run {
            report.record_success();
            continue;
        }

        match store.put(&id, payload, None) {
            Ok(()) => report.record_success(),
            Err(err @ StoreError::Storage(_)) => return Err(err.into()),
            // Anything else is a defect of this one file.
            Err(err) => report.record_failure(file, err.to_string()),
        }
    }

    log::info!(
        "build: registered {} datasets, {} failures",
        report.successes(),
        report.failures().len()
    );
    Ok(report)
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    dataset_type: String,
}

type ParseOutcome = Result<(RawFields, Payload), String>;

fn collect_candidates(
    registry: &TypeRegistry,
    root: &Path,
    options: &BuildOptions,
    report: &mut BuildReport,
) -> Result<Vec<Candidate>, BuildError> {
    // Longer suffixes are more specific and must win.
    let mut rules: Vec<&ExtensionRule> = options.extensions.iter().collect();
    rules.sort_by_key(|rule| std::cmp::Reverse(rule.suffix.len()));

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .build();

    let mut candidates = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                return Err(BuildError::Walk {
                    path: root.display().to_string(),
                    source,
                })
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(rule) = rules.iter().find(|rule| name.ends_with(&rule.suffix)) else {
            continue;
        };
        if !registry.is_registered(&rule.dataset_type) {
            report.record_failure(
                entry.path().display().to_string(),
                format!("suffix rule names unregistered type {:?}", rule.dataset_type),
            );
            continue;
        }
        candidates.push(Candidate {
            path: entry.into_path(),
            dataset_type: rule.dataset_type.clone(),
        });
    }

    // Plain datasets first, then describing (metadata) datasets; paths
    // keep the order deterministic.
    candidates.sort_by_key(|candidate| {
        let describing = registry
            .contract_for(&candidate.dataset_type)
            .map(|contract| contract.describes().is_some())
            .unwrap_or(false);
        (describing, candidate.path.clone())
    });

    Ok(candidates)
}

fn parse_and_read(
    parser: &dyn FilenameParser,
    registry: &TypeRegistry,
    candidate: &Candidate,
) -> ParseOutcome {
    let raw = parser
        .parse(&candidate.path, &candidate.dataset_type)
        .map_err(|err| err.to_string())?;
    let contract = registry
        .contract_for(&candidate.dataset_type)
        .map_err(|err| err.to_string())?;
    let payload = readers::read_payload(&candidate.path, contract).map_err(|err| err.to_string())?;
    Ok((raw, payload))
}
