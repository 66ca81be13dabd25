//! Inspect command implementation.

use super::{format_size, OutputFormat};
use crate::error::CliError;
use minikv_codec::ValueType;
use minikv_core::{Store, StoreStats, JOURNAL_FILE, MANIFEST_FILE};
use serde::Serialize;
use std::collections::BTreeMap;

/// Directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    /// Data directory.
    pub path: String,
    /// Journal file name.
    pub journal_file: &'static str,
    /// Manifest file name.
    pub manifest_file: &'static str,
    /// Store statistics.
    pub stats: StoreStats,
    /// Live keys per value type.
    pub types: BTreeMap<ValueType, usize>,
}

/// Builds the report.
pub fn report(store: &Store) -> Result<InspectReport, CliError> {
    let mut types = BTreeMap::new();
    for key in store.keys() {
        if let Some(value_type) = store.value_type(&key) {
            *types.entry(value_type).or_insert(0) += 1;
        }
    }
    Ok(InspectReport {
        path: store.path().display().to_string(),
        journal_file: JOURNAL_FILE,
        manifest_file: MANIFEST_FILE,
        stats: store.stats()?,
        types,
    })
}

/// Runs the inspect command.
pub fn run(store: &Store, format: OutputFormat) -> Result<(), CliError> {
    let report = report(store)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn print_text(report: &InspectReport) {
    let stats = &report.stats;
    println!("minikv data directory");
    println!("=====================");
    println!();
    println!("Path:        {}", report.path);
    println!("Encrypted:   {}", if stats.encrypted { "yes" } else { "no" });
    println!();
    println!("Journal ({}):", report.journal_file);
    println!("  Size:        {}", format_size(stats.journal_bytes));
    println!("  Live:        {}", format_size(stats.live_bytes));
    println!("  Compactions: {}", stats.compactions);
    println!();
    println!("Keys: {}", stats.keys);
    for (value_type, count) in &report.types {
        println!("  {value_type:<12} {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minikv_testkit::TempStore;

    #[test]
    fn counts_keys_by_type() {
        let store = TempStore::open();
        store.put_typed("a", 1i32).unwrap();
        store.put_typed("b", 2i32).unwrap();
        store.put_typed("c", String::from("x")).unwrap();

        let report = report(&store).unwrap();
        assert_eq!(report.stats.keys, 3);
        assert_eq!(report.types.get(&ValueType::I32), Some(&2));
        assert_eq!(report.types.get(&ValueType::Str), Some(&1));
        assert!(!report.stats.encrypted);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["types"]["i32"], 2);
    }
}
