use heapless::Vec;

use super::{KeyValueStore, MAX_KEYS, StoreError, StoreKey, StoredValue};

/// RAM-backed store. Used by the simulator and as the decoded form of a
/// [`FlashStore`](super::FlashStore) image.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryStore {
    entries: Vec<(StoreKey, StoredValue), MAX_KEYS>,
}

impl MemoryStore {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn from_entries(entries: Vec<(StoreKey, StoredValue), MAX_KEYS>) -> Self {
        Self { entries }
    }

    pub(crate) fn entries(&self) -> &Vec<(StoreKey, StoredValue), MAX_KEYS> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, key: StoreKey) -> Option<StoredValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|&(_, value)| value)
    }

    fn upsert(&mut self, key: StoreKey, value: StoredValue) -> Result<(), StoreError> {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return Ok(());
        }
        self.entries
            .push((key, value))
            .map_err(|_| StoreError::Full)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError> {
        Ok(self.lookup(key))
    }

    fn set(&mut self, key: StoreKey, value: StoredValue) -> Result<(), StoreError> {
        self.upsert(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(StoreKey::SeaLevelPressure), Ok(None));

        store
            .set(StoreKey::SeaLevelPressure, StoredValue::F32(1009.5))
            .unwrap();

        assert!(!store.is_empty());
        assert_eq!(
            store.get(StoreKey::SeaLevelPressure),
            Ok(Some(StoredValue::F32(1009.5)))
        );
        assert_eq!(store.get(StoreKey::SeaLevelPressureLastFetch), Ok(None));
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut store = MemoryStore::new();
        store
            .set(StoreKey::SeaLevelPressureLastFetch, StoredValue::U64(1))
            .unwrap();
        store
            .set(StoreKey::SeaLevelPressureLastFetch, StoredValue::U64(2))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(StoreKey::SeaLevelPressureLastFetch),
            Ok(Some(StoredValue::U64(2)))
        );
    }
}
