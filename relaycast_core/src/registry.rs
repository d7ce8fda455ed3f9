//! The process-wide mapping from instance name to running server or client
//! context (spec §6 GLOSSARY: "Registry"). Generic over the value type so
//! both `relaycast_server` and `relaycast_client` can reuse it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Registry<T> {
    entries: Mutex<HashMap<String, Arc<T>>>,
}

/// Returned by `insert` when the name is already taken; callers map this to
/// their own `StartError` kind.
#[derive(Debug)]
pub struct NameTaken;

impl<T> Registry<T> {
    pub const fn new() -> Self {
        Registry {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, name: &str, value: Arc<T>) -> Result<(), NameTaken> {
        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            return Err(NameTaken);
        }
        entries.insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        self.entries.lock().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_is_rejected() {
        let reg: Registry<u32> = Registry::new();
        reg.insert("a", Arc::new(1)).unwrap();
        assert!(reg.insert("a", Arc::new(2)).is_err());
    }

    #[test]
    fn remove_then_insert_same_name_succeeds() {
        let reg: Registry<u32> = Registry::new();
        reg.insert("a", Arc::new(1)).unwrap();
        reg.remove("a").unwrap();
        assert!(reg.insert("a", Arc::new(2)).is_ok());
    }
}
