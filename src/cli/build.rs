use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use locstore::build::{build, BuildOptions};
use locstore::parse::{AcquisitionParser, FilenameParser, SimpleParser};

use super::config::Config;
use super::ParserArg;

/// Build (or rebuild) a datastore from a directory of acquisition files
pub fn run(
    store_path: PathBuf,
    input: PathBuf,
    parser_arg: ParserArg,
    config: Option<PathBuf>,
    workers: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    if !input.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", input.display());
    }

    let config = match config {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let mut options = config.apply(BuildOptions::default());
    if let Some(workers) = workers {
        options.workers = workers;
    }
    options.dry_run = dry_run;

    let parser: Box<dyn FilenameParser> = match parser_arg {
        ParserArg::Simple => Box::new(SimpleParser),
        ParserArg::Acquisition => {
            let default = AcquisitionParser::new();
            match (&config.build.marker, &config.build.channels) {
                (None, None) => Box::new(default),
                (marker, channels) => {
                    let marker = marker
                        .clone()
                        .unwrap_or_else(|| locstore::parse::DEFAULT_MARKER.to_owned());
                    let channels = channels.clone().unwrap_or_else(|| {
                        locstore::parse::DEFAULT_CHANNELS
                            .iter()
                            .map(|&c| c.to_owned())
                            .collect()
                    });
                    Box::new(AcquisitionParser::with_vocabulary(marker, channels))
                }
            }
        }
    };

    let store = super::open_store(&store_path)?;

    info!("locstore build");
    info!("==============");
    info!("Store:   {}", store_path.display());
    info!("Input:   {}", input.display());
    info!("Workers: {}", options.workers);
    if dry_run {
        info!("Mode:    dry run (nothing will be written)");
    }

    let report = build(&store, parser.as_ref(), &input, &options).context("build failed")?;

    println!(
        "Registered {} datasets ({} failures)",
        report.successes(),
        report.failures().len()
    );
    for failure in report.failures() {
        eprintln!("  {}: {}", failure.file, failure.reason);
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
