//! Dump command implementation.

use super::{display_value, OutputFormat};
use crate::error::CliError;
use minikv_codec::TypedValue;
use minikv_core::Store;
use serde::Serialize;

/// One key and its value.
#[derive(Debug, Serialize)]
pub struct DumpEntry {
    /// Key.
    pub key: String,
    /// Value with its type tag.
    #[serde(flatten)]
    pub value: TypedValue,
}

/// Collects every live entry in key order.
pub fn entries(store: &Store) -> Result<Vec<DumpEntry>, CliError> {
    store
        .keys()
        .into_iter()
        .map(|key| {
            let value = store.get_value(&key)?;
            Ok(DumpEntry { key, value })
        })
        .collect()
}

/// Runs the dump command.
pub fn run(store: &Store, format: OutputFormat) -> Result<(), CliError> {
    let entries = entries(store)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            for entry in &entries {
                println!(
                    "{}\t{}\t{}",
                    entry.key,
                    entry.value.value_type(),
                    display_value(&entry.value)
                );
            }
        }
    }
    Ok(())
}
