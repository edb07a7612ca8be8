use anyhow::Result;
use std::path::PathBuf;

use locstore::key;

/// List dataset identifiers matching optional filters
pub fn run(
    store_path: PathBuf,
    dataset_type: Option<String>,
    prefix: Option<String>,
    acq_id: Option<u32>,
) -> Result<()> {
    let store = super::open_store(&store_path)?;

    let ids = store.query(|id| {
        dataset_type
            .as_deref()
            .map_or(true, |t| id.dataset_type() == t)
            && prefix.as_deref().map_or(true, |p| id.prefix() == p)
            && acq_id.map_or(true, |n| id.acq_id() == n)
    })?;

    for id in &ids {
        println!("{}\t{}", key::encode(id), id);
    }
    log::info!("{} datasets matched", ids.len());
    Ok(())
}
