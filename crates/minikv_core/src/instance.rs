//! Instance lifecycle.
//!
//! An [`Instance`] is the unit the C ABI hands out. It moves between three
//! states:
//!
//! ```text
//! Uninitialized --initialize--> Open --close/clear_all--> Closed
//!                                 ^                          |
//!                                 +-------initialize---------+
//! ```
//!
//! Accessors clone the open store's `Arc` under a read lock and drop the
//! lock before touching the engine, so a slow write never blocks `close`.
//! A call that races `close` either finishes against the store it cloned or
//! sees [`CoreError::InstanceClosed`] from the store itself.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use parking_lot::{const_rwlock, RwLock};
use std::sync::Arc;

/// Lifecycle state without the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Never initialized.
    Uninitialized,
    /// A store is open.
    Open,
    /// Closed, cleared, or failed to initialize.
    Closed,
}

enum Slot {
    Uninitialized,
    Open(Arc<Store>),
    Closed,
}

/// A lifecycle-managed store handle.
pub struct Instance {
    slot: RwLock<Slot>,
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl Instance {
    /// Creates an uninitialized instance. Usable in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: const_rwlock(Slot::Uninitialized),
        }
    }

    /// Opens a store, closing any store this instance already had open.
    ///
    /// On failure the instance is left `Closed`.
    pub fn initialize(&self, config: Config) -> CoreResult<()> {
        let mut slot = self.slot.write();
        if let Slot::Open(previous) = std::mem::replace(&mut *slot, Slot::Closed) {
            tracing::info!(dir = %previous.path().display(), "closing store before re-initialize");
            if let Err(e) = previous.close() {
                tracing::warn!(error = %e, "previous store did not close cleanly");
            }
        }

        let dir = config.dir.clone();
        match Store::open(config) {
            Ok(store) => {
                *slot = Slot::Open(Arc::new(store));
                tracing::info!(dir = %dir.display(), "instance initialized");
                Ok(())
            }
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "instance initialization failed");
                Err(e)
            }
        }
    }

    /// Returns the open store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InstanceClosed`] unless the instance is open.
    pub fn store(&self) -> CoreResult<Arc<Store>> {
        match &*self.slot.read() {
            Slot::Open(store) => Ok(Arc::clone(store)),
            Slot::Uninitialized | Slot::Closed => Err(CoreError::InstanceClosed),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> InstanceState {
        match &*self.slot.read() {
            Slot::Uninitialized => InstanceState::Uninitialized,
            Slot::Open(_) => InstanceState::Open,
            Slot::Closed => InstanceState::Closed,
        }
    }

    /// Closes the open store, keeping its data. No-op unless open.
    pub fn close(&self) {
        let mut slot = self.slot.write();
        match std::mem::replace(&mut *slot, Slot::Closed) {
            Slot::Open(store) => {
                if let Err(e) = store.close() {
                    tracing::warn!(error = %e, "store did not close cleanly");
                }
            }
            Slot::Uninitialized => *slot = Slot::Uninitialized,
            Slot::Closed => {}
        }
    }

    /// Deletes the open store's data and closes it. No-op unless open.
    pub fn clear_all(&self) -> CoreResult<()> {
        let mut slot = self.slot.write();
        match std::mem::replace(&mut *slot, Slot::Closed) {
            Slot::Open(store) => store.clear_all(),
            other => {
                tracing::warn!("clear_all on an instance that is not open");
                *slot = other;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("state", &self.state())
            .finish()
    }
}
