use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

use locstore::store::STORE_FORMAT_VERSION;

/// Display summary information about a datastore
pub fn run(store_path: PathBuf) -> Result<()> {
    if !store_path.is_dir() {
        anyhow::bail!("Store does not exist: {}", store_path.display());
    }
    let store = super::open_store(&store_path)?;
    let ids = store.query(|_| true)?;

    let mut per_type: BTreeMap<&str, usize> = BTreeMap::new();
    let mut prefixes: BTreeMap<&str, usize> = BTreeMap::new();
    for id in &ids {
        *per_type.entry(id.dataset_type()).or_default() += 1;
        *prefixes.entry(id.prefix()).or_default() += 1;
    }

    println!("locstore Container Information");
    println!("==============================");
    println!("Store: {}", store_path.display());
    println!("Format version: {STORE_FORMAT_VERSION}");
    println!();

    println!("Datasets: {}", ids.len());
    for (dataset_type, count) in &per_type {
        println!("  {dataset_type}: {count}");
    }
    println!();

    println!("Acquisition groups: {}", prefixes.len());
    for (prefix, count) in &prefixes {
        println!("  {prefix}: {count} datasets");
    }

    Ok(())
}
