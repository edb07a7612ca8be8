//! # locstore CLI
//!
//! A command-line tool for building and inspecting localization microscopy
//! datastores.
//!
//! ## Usage
//!
//! ```bash
//! # Build a datastore from a directory of acquisition files
//! locstore build experiment.store ./acquisitions
//!
//! # Summarize a datastore
//! locstore info experiment.store
//!
//! # List datasets of one type
//! locstore query experiment.store --dataset-type Localizations
//!
//! # Print a payload
//! locstore get experiment.store HeLaL_Control/HeLaL_Control_1/Localizations
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::init_logging(args.verbosity());
    cli::dispatch(args)
}
