//! Clear command implementation.

use crate::error::CliError;
use minikv_core::Store;

/// Runs the clear command.
pub fn run(store: Store) -> Result<(), CliError> {
    let path = store.path().display().to_string();
    let keys = store.len();
    store.clear_all()?;
    tracing::info!(dir = %path, keys, "cleared");
    println!("Cleared {keys} keys from {path}");
    Ok(())
}
