//! Compact command implementation.

use super::format_size;
use crate::error::CliError;
use minikv_core::Store;

/// Runs the compact command.
pub fn run(store: &Store) -> Result<(), CliError> {
    let before = store.stats()?;
    store.compact()?;
    let after = store.stats()?;
    println!(
        "Journal compacted: {} -> {} ({} keys)",
        format_size(before.journal_bytes),
        format_size(after.journal_bytes),
        after.keys
    );
    Ok(())
}
