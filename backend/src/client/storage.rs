//! Port over the page's client-side storage.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::context::{StorageArea, TeardownPlan};

/// Storage the page can write to and must clean up on teardown.
#[cfg_attr(test, mockall::automock)]
pub trait PageStorage: Send + Sync {
    /// Remove one key from a storage area.
    fn remove_item(&self, area: StorageArea, key: &str);

    /// Apply a `Set-Cookie` value.
    fn set_cookie(&self, header: &str);
}

/// Carry out the client-side part of a teardown.
pub fn apply_plan(plan: &TeardownPlan, storage: &dyn PageStorage) {
    for (area, key) in &plan.clear_storage {
        storage.remove_item(*area, key);
    }
    for header in plan.set_cookie_headers() {
        storage.set_cookie(&header);
    }
}

/// In-process storage for headless clients.
#[derive(Debug, Default)]
pub struct MemoryPageStorage {
    items: Mutex<HashMap<(StorageArea, String), String>>,
    cookie_headers: Mutex<Vec<String>>,
}

impl MemoryPageStorage {
    pub fn set_item(&self, area: StorageArea, key: impl Into<String>, value: impl Into<String>) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((area, key.into()), value.into());
    }

    pub fn get_item(&self, area: StorageArea, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(area, key.to_owned()))
            .cloned()
    }

    /// Every `Set-Cookie` value applied so far.
    pub fn cookie_headers(&self) -> Vec<String> {
        self.cookie_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PageStorage for MemoryPageStorage {
    fn remove_item(&self, area: StorageArea, key: &str) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(area, key.to_owned()));
    }

    fn set_cookie(&self, header: &str) {
        self.cookie_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(header.to_owned());
    }
}
