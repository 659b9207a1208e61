// ============================================================================
// STORAGE - Key/value collaborator (localStorage in the browser)
// ============================================================================

use serde::{de::DeserializeOwned, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str);
}

/// In-process store, used natively and in tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// `window.localStorage`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserStorage;

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        use gloo_storage::Storage;
        gloo_storage::LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        use gloo_storage::Storage;
        gloo_storage::LocalStorage::raw()
            .set_item(key, value)
            .map_err(|_| format!("Could not write '{}' to localStorage", key))
    }

    fn remove(&self, key: &str) {
        use gloo_storage::Storage;
        if gloo_storage::LocalStorage::raw().remove_item(key).is_err() {
            log::warn!("⚠️ Could not remove '{}' from localStorage", key);
        }
    }
}

pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), String> {
    let json = serde_json::to_string(value)
        .map_err(|e| format!("Error serializing '{}': {}", key, e))?;
    store.set(key, &json)
}

/// Missing and undecodable entries both read as `None`
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let json = store.get(key)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("⚠️ Discarding unreadable '{}' from storage: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_through_memory_storage() {
        let store = MemoryStorage::new();
        save_json(&store, "numbers", &vec![1, 2, 3]).unwrap();
        assert_eq!(load_json::<Vec<u32>>(&store, "numbers"), Some(vec![1, 2, 3]));

        store.remove("numbers");
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_entries_read_as_missing() {
        let store = MemoryStorage::new();
        store.set("session", "{not json").unwrap();
        assert_eq!(load_json::<Vec<u32>>(&store, "session"), None);
    }
}
