use anyhow::{Context, Result};
use std::path::PathBuf;

/// Delete the dataset stored under a key
pub fn run(store_path: PathBuf, key: String, metadata: Option<String>) -> Result<()> {
    let store = super::open_store(&store_path)?;
    let id = super::resolve_id(&store, &key, metadata.as_deref())?;

    let existed = store
        .delete(&id)
        .with_context(|| format!("failed to delete {id}"))?;
    if existed {
        println!("Deleted {id}");
    } else {
        println!("Nothing stored for {id}");
    }
    Ok(())
}
