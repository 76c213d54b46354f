//! Sea-level pressure reference with a fetch-on-stale cache policy

use log::{debug, warn};

use super::{KeyValueStore, StoreError, StoreKey, StoredValue};
use crate::weather::{FetchError, PressureSource};

/// Cached reference as persisted across power cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRecord {
    pub value_hpa: f32,
    /// Epoch seconds of the fetch that produced `value_hpa`
    pub fetched_at: u64,
}

impl CalibrationRecord {
    /// Age at `now`, or `None` when the record is from the future (clock not
    /// set, or set backwards since the fetch).
    pub fn age(&self, now: u64) -> Option<u64> {
        now.checked_sub(self.fetched_at)
    }
}

/// Where the reference returned by [`CalibrationCache::get`] came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationSource {
    /// Persisted value, still fresh
    Cached { age_secs: u64 },
    /// Fetched this cycle and persisted
    Refreshed,
    /// Fetched this cycle but could not be persisted
    RefreshedUnsaved(StoreError),
    /// Stale or missing and the refresh failed; the value is 0
    Unavailable(FetchError),
}

/// Result of one calibration lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Reference to derive altitude from, 0 when unavailable
    pub sea_level_hpa: f32,
    pub source: CalibrationSource,
}

/// Persisted sea-level reference that refreshes itself once it is older than
/// `max_age_secs`.
///
/// A refresh makes exactly one fetch attempt. On failure the lookup yields 0
/// and the persisted record is left alone, so the following wake tries again.
pub struct CalibrationCache<K> {
    store: K,
    max_age_secs: u64,
}

impl<K: KeyValueStore> CalibrationCache<K> {
    pub fn new(store: K, max_age_secs: u64) -> Self {
        Self {
            store,
            max_age_secs,
        }
    }

    /// Read the persisted record. `Ok(None)` if either key is missing.
    pub fn load(&mut self) -> Result<Option<CalibrationRecord>, StoreError> {
        let value = self
            .read(StoreKey::SeaLevelPressure)?
            .and_then(StoredValue::as_f32);
        let fetched_at = self
            .read(StoreKey::SeaLevelPressureLastFetch)?
            .and_then(StoredValue::as_u64);

        Ok(match (value, fetched_at) {
            (Some(value_hpa), Some(fetched_at)) => Some(CalibrationRecord {
                value_hpa,
                fetched_at,
            }),
            _ => None,
        })
    }

    fn read(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError> {
        let value = self.store.get(key).inspect_err(|e| {
            warn!("Reading {} failed: {}", key.as_str(), e);
        })?;
        if value.is_none() {
            debug!("No {} stored", key.as_str());
        }
        Ok(value)
    }

    /// Persist a freshly fetched reference, value and timestamp together.
    pub fn save(&mut self, record: CalibrationRecord) -> Result<(), StoreError> {
        self.store.set_all(&[
            (
                StoreKey::SeaLevelPressure,
                StoredValue::F32(record.value_hpa),
            ),
            (
                StoreKey::SeaLevelPressureLastFetch,
                StoredValue::U64(record.fetched_at),
            ),
        ])
    }

    /// Current sea-level reference at wall-clock time `now` (epoch seconds).
    pub async fn get<F: PressureSource>(&mut self, now: u64, fetcher: &mut F) -> Calibration {
        let cached = match self.load() {
            Ok(record) => record,
            Err(_) => {
                debug!("Treating unreadable calibration as stale");
                None
            }
        };

        if let Some(record) = cached {
            match record.age(now) {
                Some(age_secs) if age_secs <= self.max_age_secs => {
                    debug!("Calibration {} hPa is {}s old", record.value_hpa, age_secs);
                    return Calibration {
                        sea_level_hpa: record.value_hpa,
                        source: CalibrationSource::Cached { age_secs },
                    };
                }
                Some(age_secs) => debug!("Calibration is stale ({}s old)", age_secs),
                None => debug!(
                    "Calibration fetched at {} is ahead of clock {}",
                    record.fetched_at, now
                ),
            }
        }

        let value_hpa = match fetcher.fetch().await {
            Ok(value_hpa) => value_hpa,
            Err(e) => {
                return Calibration {
                    sea_level_hpa: 0.0,
                    source: CalibrationSource::Unavailable(e),
                };
            }
        };

        let source = match self.save(CalibrationRecord {
            value_hpa,
            fetched_at: now,
        }) {
            Ok(()) => CalibrationSource::Refreshed,
            Err(e) => {
                warn!(
                    "Writing {} and {} failed: {}",
                    StoreKey::SeaLevelPressure.as_str(),
                    StoreKey::SeaLevelPressureLastFetch.as_str(),
                    e
                );
                CalibrationSource::RefreshedUnsaved(e)
            }
        };

        Calibration {
            sea_level_hpa: value_hpa,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use embassy_futures::block_on;

    const DAY: u64 = 24 * 60 * 60;
    const NOW: u64 = 1_700_000_000;

    struct CountingFetcher {
        calls: usize,
        result: Result<f32, FetchError>,
    }

    impl CountingFetcher {
        fn ok(value: f32) -> Self {
            Self {
                calls: 0,
                result: Ok(value),
            }
        }

        fn failing(error: FetchError) -> Self {
            Self {
                calls: 0,
                result: Err(error),
            }
        }
    }

    impl PressureSource for CountingFetcher {
        async fn fetch(&mut self) -> Result<f32, FetchError> {
            self.calls += 1;
            self.result
        }
    }

    /// Store whose writes always fail
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError> {
            self.0.get(key)
        }

        fn set(&mut self, _: StoreKey, _: StoredValue) -> Result<(), StoreError> {
            Err(StoreError::Flash { operation: "write" })
        }
    }

    fn seeded(value_hpa: f32, fetched_at: u64) -> MemoryStore {
        let mut store = MemoryStore::new();
        CalibrationCache::new(&mut store, DAY)
            .save(CalibrationRecord {
                value_hpa,
                fetched_at,
            })
            .unwrap();
        store
    }

    #[test]
    fn test_fresh_record_never_fetches() {
        for age in [0, 1, 3600, DAY - 1, DAY] {
            let mut store = seeded(1008.5, NOW - age);
            let mut fetcher = CountingFetcher::ok(990.0);
            let mut cache = CalibrationCache::new(&mut store, DAY);

            let calibration = block_on(cache.get(NOW, &mut fetcher));

            assert_eq!(fetcher.calls, 0, "age {age}s must not fetch");
            assert_eq!(calibration.sea_level_hpa, 1008.5);
            assert_eq!(
                calibration.source,
                CalibrationSource::Cached { age_secs: age }
            );
        }
    }

    #[test]
    fn test_stale_record_fetches_once_and_persists() {
        for age in [DAY + 1, 2 * DAY, 30 * DAY] {
            let mut store = seeded(1008.5, NOW - age);
            let mut fetcher = CountingFetcher::ok(1011.25);
            let mut cache = CalibrationCache::new(&mut store, DAY);

            let calibration = block_on(cache.get(NOW, &mut fetcher));

            assert_eq!(fetcher.calls, 1);
            assert_eq!(calibration.sea_level_hpa, 1011.25);
            assert_eq!(calibration.source, CalibrationSource::Refreshed);
            assert_eq!(
                cache.load().unwrap(),
                Some(CalibrationRecord {
                    value_hpa: 1011.25,
                    fetched_at: NOW
                })
            );
        }
    }

    #[test]
    fn test_failed_refresh_returns_zero_and_keeps_record() {
        let mut store = seeded(1008.5, NOW - 2 * DAY);
        let before = store.clone();
        let mut fetcher = CountingFetcher::failing(FetchError::Status(503));

        let calibration = block_on(CalibrationCache::new(&mut store, DAY).get(NOW, &mut fetcher));

        assert_eq!(fetcher.calls, 1);
        assert_eq!(calibration.sea_level_hpa, 0.0);
        assert_eq!(
            calibration.source,
            CalibrationSource::Unavailable(FetchError::Status(503))
        );
        assert_eq!(store, before);
    }

    #[test]
    fn test_missing_record_fetches() {
        let mut store = MemoryStore::new();
        let mut fetcher = CountingFetcher::ok(1020.0);

        let calibration = block_on(CalibrationCache::new(&mut store, DAY).get(NOW, &mut fetcher));

        assert_eq!(fetcher.calls, 1);
        assert_eq!(calibration.sea_level_hpa, 1020.0);
    }

    #[test]
    fn test_record_ahead_of_clock_is_stale() {
        // Fetched "in the future" relative to an unsynced clock
        let mut store = seeded(1008.5, NOW);
        let mut fetcher = CountingFetcher::ok(1001.0);

        let calibration = block_on(CalibrationCache::new(&mut store, DAY).get(1_000, &mut fetcher));

        assert_eq!(fetcher.calls, 1);
        assert_eq!(calibration.sea_level_hpa, 1001.0);
    }

    #[test]
    fn test_refresh_is_returned_even_if_it_cannot_be_saved() {
        let mut store = ReadOnlyStore(MemoryStore::new());
        let mut fetcher = CountingFetcher::ok(1015.0);

        let calibration = block_on(CalibrationCache::new(&mut store, DAY).get(NOW, &mut fetcher));

        assert_eq!(calibration.sea_level_hpa, 1015.0);
        assert_eq!(
            calibration.source,
            CalibrationSource::RefreshedUnsaved(StoreError::Flash { operation: "write" })
        );
    }

    #[test]
    fn test_refreshed_value_reads_back_exactly() {
        let fetched = 1013.123_4_f32;
        let mut store = MemoryStore::new();
        let mut cache = CalibrationCache::new(&mut store, DAY);

        block_on(cache.get(NOW, &mut CountingFetcher::ok(fetched)));
        let mut unused = CountingFetcher::ok(0.0);
        let again = block_on(cache.get(NOW + DAY / 2, &mut unused));

        assert_eq!(unused.calls, 0);
        assert_eq!(again.sea_level_hpa.to_bits(), fetched.to_bits());
    }
}
