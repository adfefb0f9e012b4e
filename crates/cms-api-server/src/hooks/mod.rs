//! Typed extension points for the menu item write pipeline.
//!
//! Listeners are registered at startup and invoked explicitly; there is no
//! name-based dispatch. Filters run in registration order and the first
//! rejection aborts the write.

use parking_lot::RwLock;
use tracing::debug;

use crate::store::{NavMenuItem, PreparedMenuItem};
use crate::utils::ApiError;

/// May adjust or reject a prepared write payload. `creating` distinguishes
/// inserts from updates.
pub type PreInsertFilter =
    Box<dyn Fn(&mut PreparedMenuItem, bool) -> Result<(), ApiError> + Send + Sync>;

/// Notified with the stored item view; fire-and-forget.
pub type InsertListener = Box<dyn Fn(&NavMenuItem, bool) + Send + Sync>;

#[derive(Default)]
pub struct MenuItemHooks {
    pre_insert: RwLock<Vec<PreInsertFilter>>,
    insert: RwLock<Vec<InsertListener>>,
    after_insert: RwLock<Vec<InsertListener>>,
}

impl MenuItemHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pre_insert<F>(&self, filter: F)
    where
        F: Fn(&mut PreparedMenuItem, bool) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.pre_insert.write().push(Box::new(filter));
    }

    /// Listener fired right after the store write, before metadata and
    /// additional fields are applied.
    pub fn on_insert<F>(&self, listener: F)
    where
        F: Fn(&NavMenuItem, bool) + Send + Sync + 'static,
    {
        self.insert.write().push(Box::new(listener));
    }

    /// Listener fired once the write pipeline has fully completed.
    pub fn on_after_insert<F>(&self, listener: F)
    where
        F: Fn(&NavMenuItem, bool) + Send + Sync + 'static,
    {
        self.after_insert.write().push(Box::new(listener));
    }

    pub fn apply_pre_insert(
        &self,
        item: &mut PreparedMenuItem,
        creating: bool,
    ) -> Result<(), ApiError> {
        for filter in self.pre_insert.read().iter() {
            filter(item, creating)?;
        }
        Ok(())
    }

    pub fn emit_insert(&self, item: &NavMenuItem, creating: bool) {
        let listeners = self.insert.read();
        debug!("insert event for item {} ({} listeners)", item.id, listeners.len());
        for listener in listeners.iter() {
            listener(item, creating);
        }
    }

    pub fn emit_after_insert(&self, item: &NavMenuItem, creating: bool) {
        for listener in self.after_insert.read().iter() {
            listener(item, creating);
        }
    }
}
