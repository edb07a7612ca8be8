use anyhow::{Context, Result};
use std::io::Write as _;
use std::path::PathBuf;

/// Print the payload stored under a key
pub fn run(store_path: PathBuf, key: String, metadata: Option<String>) -> Result<()> {
    let store = super::open_store(&store_path)?;
    let id = super::resolve_id(&store, &key, metadata.as_deref())?;

    let payload = store
        .get(&id)
        .with_context(|| format!("failed to fetch {id}"))?;

    // The type's own codec renders the payload in its natural text form:
    // CSV for tables, JSON for mappings and images.
    let contract = store.registry().contract_for(id.dataset_type())?;
    let bytes = contract.codec().serialize(&payload)?;
    std::io::stdout().write_all(&bytes)?;
    Ok(())
}
