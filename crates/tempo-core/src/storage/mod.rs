pub mod calibration;
pub mod flash;
pub mod memory;

pub use calibration::{Calibration, CalibrationCache, CalibrationRecord, CalibrationSource};
pub use flash::FlashStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Number of distinct keys a store can hold
pub const MAX_KEYS: usize = 2;

/// Keys of the persistent store.
///
/// The set is closed: the node only ever persists its calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKey {
    /// Sea-level pressure in hPa (`f32`)
    SeaLevelPressure,
    /// Epoch seconds of the fetch that produced it (`u64`)
    SeaLevelPressureLastFetch,
}

impl StoreKey {
    /// Name of the key as it appears in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeaLevelPressure => "sea_level_pressure",
            Self::SeaLevelPressureLastFetch => "sea_level_pressure_last_fetch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    F32(f32),
    U64(u64),
}

impl StoredValue {
    pub fn as_f32(self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(v),
            Self::U64(_) => None,
        }
    }

    pub fn as_u64(self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(v),
            Self::F32(_) => None,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("Flash {operation} failed")]
    Flash { operation: &'static str },
    #[error("Stored image is corrupt")]
    Corrupt,
    #[error("Store is full")]
    Full,
}

/// Key-value storage that survives power cycles.
pub trait KeyValueStore {
    fn get(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError>;

    fn set(&mut self, key: StoreKey, value: StoredValue) -> Result<(), StoreError>;

    /// Write several entries as one commit where the backend supports it.
    fn set_all(&mut self, entries: &[(StoreKey, StoredValue)]) -> Result<(), StoreError> {
        for &(key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

impl<T: KeyValueStore> KeyValueStore for &mut T {
    fn get(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: StoreKey, value: StoredValue) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn set_all(&mut self, entries: &[(StoreKey, StoredValue)]) -> Result<(), StoreError> {
        (**self).set_all(entries)
    }
}
