//! Recording fakes for whole-cycle tests
//!
//! Every fake shares one [`Bench`]: a fake clock that only moves when a fake
//! delay (or a slow collaborator) advances it, plus logs of everything the
//! controller asked for.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use tempo_core::cloud::{CloudSession, RecordId, TransportError};
use tempo_core::config::DutyCycleConfig;
use tempo_core::platform::{Clock, Network, NetworkError, Parts, Platform, PowerControl};
use tempo_core::sensors::{EnvironmentSensor, RawReading, SensorError};
use tempo_core::storage::{KeyValueStore, MemoryStore, StoreError, StoreKey, StoredValue};
use tempo_core::weather::{FetchError, PressureSource};

/// Unix time the fake NTP server reports at boot
pub const BOOT_UNIX: u64 = 1_717_000_000;

pub const READING: RawReading = RawReading {
    temperature_c: 22.5,
    humidity_percent: 48.0,
    pressure_pa: 100_125.0,
};

#[derive(Default)]
pub struct Bench {
    now_us: Cell<u64>,
    pub init_attempts_at: RefCell<Vec<Duration>>,
    pub reads: Cell<usize>,
    pub fetches: Cell<usize>,
    pub polls: Cell<u32>,
    pub pushes: RefCell<Vec<(String, String)>>,
    pub deep_sleeps: RefCell<Vec<Duration>>,
    pub halts: Cell<usize>,
    pub sensor_slept: Cell<bool>,
    pub network_down: Cell<bool>,
    /// `(sensor_slept, network_down)` as seen by each deep-sleep request
    pub quiesced_at_sleep: RefCell<Vec<(bool, bool)>>,
    pub store: RefCell<MemoryStore>,
}

impl Bench {
    pub fn now(&self) -> Duration {
        Duration::from_micros(self.now_us.get())
    }

    pub fn advance(&self, by: Duration) {
        self.now_us.set(self.now_us.get() + by.as_micros());
    }

    pub fn seed_calibration(&self, value_hpa: f32, fetched_at: u64) {
        let mut store = self.store.borrow_mut();
        store
            .set(StoreKey::SeaLevelPressure, StoredValue::F32(value_hpa))
            .unwrap();
        store
            .set(StoreKey::SeaLevelPressureLastFetch, StoredValue::U64(fetched_at))
            .unwrap();
    }

    /// Pushed bodies parsed as JSON
    pub fn pushed_records(&self) -> Vec<serde_json::Value> {
        self.pushes
            .borrow()
            .iter()
            .map(|(_, body)| serde_json::from_str(body).unwrap())
            .collect()
    }
}

pub struct FakeSensor {
    bench: Rc<Bench>,
    pub init_ok: bool,
    pub reading: Result<RawReading, SensorError>,
}

impl EnvironmentSensor for FakeSensor {
    const NAME: &'static str = "FAKE";

    async fn init(&mut self) -> Result<(), SensorError> {
        self.bench.init_attempts_at.borrow_mut().push(self.bench.now());
        if self.init_ok {
            Ok(())
        } else {
            Err(SensorError::InitializationFailed {
                sensor: "FAKE",
                details: "no ack",
            })
        }
    }

    async fn read(&mut self) -> Result<RawReading, SensorError> {
        self.bench.reads.set(self.bench.reads.get() + 1);
        self.reading
    }

    async fn sleep(&mut self) -> Result<(), SensorError> {
        self.bench.sensor_slept.set(true);
        Ok(())
    }
}

pub struct FakeNetwork {
    bench: Rc<Bench>,
    pub time_sync_ok: bool,
}

impl Network for FakeNetwork {
    async fn connect(&mut self) -> Result<(), NetworkError> {
        self.bench.advance(Duration::from_millis(1500));
        Ok(())
    }

    async fn sync_time(&mut self) -> Result<u64, NetworkError> {
        if self.time_sync_ok {
            Ok(BOOT_UNIX + self.bench.now().as_secs())
        } else {
            Err(NetworkError::TimeSync("no reply"))
        }
    }

    async fn shutdown(&mut self) {
        self.bench.network_down.set(true);
    }
}

pub struct FakeSession {
    bench: Rc<Bench>,
    pub initialized: bool,
    /// `None` never becomes ready
    pub ready_after_polls: Option<u32>,
    pub push_error: Option<TransportError>,
}

impl CloudSession for FakeSession {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn is_ready(&self) -> bool {
        self.ready_after_polls
            .is_some_and(|n| self.bench.polls.get() >= n)
    }

    async fn poll(&mut self) {
        self.bench.polls.set(self.bench.polls.get() + 1);
    }

    async fn push(&mut self, path: &str, body: &[u8]) -> Result<RecordId, TransportError> {
        let body = String::from_utf8(body.to_vec()).unwrap();
        self.bench.pushes.borrow_mut().push((path.to_owned(), body));
        match &self.push_error {
            Some(e) => Err(e.clone()),
            None => Ok(RecordId::try_from("-Nrec0001").unwrap()),
        }
    }
}

pub struct FakeFetcher {
    bench: Rc<Bench>,
    pub result: Result<f32, FetchError>,
}

impl PressureSource for FakeFetcher {
    async fn fetch(&mut self) -> Result<f32, FetchError> {
        self.bench.fetches.set(self.bench.fetches.get() + 1);
        self.result
    }
}

/// The bench's store, surviving the controller
pub struct BenchStore(Rc<Bench>);

impl KeyValueStore for BenchStore {
    fn get(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError> {
        self.0.store.borrow_mut().get(key)
    }

    fn set(&mut self, key: StoreKey, value: StoredValue) -> Result<(), StoreError> {
        self.0.store.borrow_mut().set(key, value)
    }
}

pub struct FakePower(Rc<Bench>);

impl PowerControl for FakePower {
    fn deep_sleep(&mut self, duration: Duration) {
        self.0
            .quiesced_at_sleep
            .borrow_mut()
            .push((self.0.sensor_slept.get(), self.0.network_down.get()));
        self.0.deep_sleeps.borrow_mut().push(duration);
    }

    async fn halt(&mut self) {
        self.0.halts.set(self.0.halts.get() + 1);
    }
}

pub struct FakeClock(Rc<Bench>);

impl Clock for FakeClock {
    fn uptime(&self) -> Duration {
        self.0.now()
    }
}

pub struct FakeDelay(Rc<Bench>);

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.advance(Duration::from_micros(ns as u64 / 1_000));
    }
}

pub struct Bed;

impl Platform for Bed {
    type Sensor = FakeSensor;
    type Network = FakeNetwork;
    type Session = FakeSession;
    type Fetcher = FakeFetcher;
    type Store = BenchStore;
    type Power = FakePower;
    type Clock = FakeClock;
    type Delay = FakeDelay;
}

/// Collaborators that all succeed: sensor up first try, session ready after
/// three polls, fetch returns 1013.25 hPa.
pub fn healthy_parts(bench: &Rc<Bench>) -> Parts<Bed> {
    Parts {
        sensor: FakeSensor {
            bench: bench.clone(),
            init_ok: true,
            reading: Ok(READING),
        },
        network: FakeNetwork {
            bench: bench.clone(),
            time_sync_ok: true,
        },
        session: FakeSession {
            bench: bench.clone(),
            initialized: true,
            ready_after_polls: Some(3),
            push_error: None,
        },
        fetcher: FakeFetcher {
            bench: bench.clone(),
            result: Ok(1013.25),
        },
        store: BenchStore(bench.clone()),
        power: FakePower(bench.clone()),
        clock: FakeClock(bench.clone()),
        delay: FakeDelay(bench.clone()),
    }
}

pub fn duty_cycle() -> DutyCycleConfig {
    DutyCycleConfig::default()
}
