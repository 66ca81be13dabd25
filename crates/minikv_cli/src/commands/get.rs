//! Get command implementation.

use super::display_value;
use crate::error::CliError;
use minikv_core::Store;

/// Runs the get command.
pub fn run(store: &Store, key: &str) -> Result<(), CliError> {
    let value = store.get_value(key)?;
    println!("{} {}", value.value_type(), display_value(&value));
    Ok(())
}
