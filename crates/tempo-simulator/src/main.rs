//! Desktop simulator for the tempo-sensor duty-cycle node.
//!
//! Runs the real [`DutyCycleController`] from tempo-core against simulated
//! collaborators, so a full wake cycle can be watched without hardware.
//!
//! # Usage
//!
//! ```text
//! tempo-simulator [CONFIG_JSON] [CYCLES]
//! ```
//!
//! | Argument      | Default                     |
//! |---------------|-----------------------------|
//! | `CONFIG_JSON` | built-in defaults           |
//! | `CYCLES`      | 3                           |
//!
//! Deep sleep is compressed by [`SLEEP_COMPRESSION`]; the simulated wall clock
//! still advances by the full interval so calibration ageing behaves as on the
//! node. Set `RUST_LOG=info` (or `debug`) to see the cycle log.

use std::cell::{Cell, RefCell};
use std::fmt::Write;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use tempo_core::cloud::{CloudSession, RecordId, TransportError};
use tempo_core::config::Config;
use tempo_core::controller::{CycleOutcome, DutyCycleController};
use tempo_core::platform::{Clock, Network, NetworkError, Parts, Platform, PowerControl};
use tempo_core::sensors::{EnvironmentSensor, RawReading, SensorError};
use tempo_core::storage::{KeyValueStore, MemoryStore, StoreError, StoreKey, StoredValue};
use tempo_core::weather::{FetchError, PressureSource};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Real time spent in deep sleep is the configured interval divided by this.
const SLEEP_COMPRESSION: u32 = 20;

const DEFAULT_CYCLES: u32 = 3;

/// Auth polls before the simulated session holds a token
const POLLS_UNTIL_READY: u32 = 4;

/// Simulated DHCP + association time
const CONNECT_TIME: std::time::Duration = std::time::Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Shared node state
// ---------------------------------------------------------------------------

/// State that survives deep sleep on the real node: the persistent store and
/// the wall clock (RTC). Everything else is rebuilt every cycle.
#[derive(Default)]
struct Node {
    store: RefCell<MemoryStore>,
    /// Seconds spent in simulated deep sleep so far
    slept_secs: Cell<u64>,
    /// Seconds of sensor time, drives the synthetic waveforms
    sensor_secs: Cell<f64>,
    records: Cell<u32>,
}

impl Node {
    /// Host time plus everything skipped by compressed sleeps.
    fn unix_now(&self) -> u64 {
        let host = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        host + self.slept_secs.get()
    }
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// BME280 stand-in producing slowly drifting readings.
struct SimSensor {
    node: Rc<Node>,
}

impl EnvironmentSensor for SimSensor {
    const NAME: &'static str = "SIM-BME280";

    async fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn read(&mut self) -> Result<RawReading, SensorError> {
        let t = self.node.sensor_secs.get();

        // Temperature: 18–24 °C sinusoidal with slow drift
        let temperature = 21.0 + 3.0 * (t / 900.0).sin() + 0.3 * (t / 97.0).cos();

        // Humidity: 35–55 % with a different period
        let humidity = 45.0 + 10.0 * (t / 1_300.0).sin() + 1.5 * (t / 71.0).cos();

        // Station pressure: ~1000 hPa with a weather-front swing
        let pressure = 100_000.0 + 600.0 * (t / 3_600.0).sin() + 15.0 * (t / 53.0).cos();

        Ok(RawReading {
            temperature_c: temperature as f32,
            humidity_percent: humidity as f32,
            pressure_pa: pressure as f32,
        })
    }

    async fn sleep(&mut self) -> Result<(), SensorError> {
        info!("[sensor] Sleep mode");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulated collaborators
// ---------------------------------------------------------------------------

struct SimNetwork {
    node: Rc<Node>,
}

impl Network for SimNetwork {
    async fn connect(&mut self) -> Result<(), NetworkError> {
        std::thread::sleep(CONNECT_TIME);
        info!("[Wi-Fi] Connected with IP: 192.168.4.2");
        Ok(())
    }

    async fn sync_time(&mut self) -> Result<u64, NetworkError> {
        Ok(self.node.unix_now())
    }

    async fn shutdown(&mut self) {
        info!("[Wi-Fi] Radio off");
    }
}

/// Cloud session that signs in after a few polls and logs every push.
struct SimSession {
    node: Rc<Node>,
    initialized: bool,
    polls: u32,
}

impl CloudSession for SimSession {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn is_ready(&self) -> bool {
        self.polls >= POLLS_UNTIL_READY
    }

    async fn poll(&mut self) {
        self.polls += 1;
        if self.is_ready() {
            info!("[cloud] Signed in after {} polls", self.polls);
        }
    }

    async fn push(&mut self, path: &str, body: &[u8]) -> Result<RecordId, TransportError> {
        if !self.is_ready() {
            return Err(TransportError::new(
                TransportError::NOT_AUTHENTICATED,
                "Not signed in",
            ));
        }

        let n = self.node.records.get() + 1;
        self.node.records.set(n);
        info!(
            "[cloud] POST /{}.json {}",
            path,
            String::from_utf8_lossy(body)
        );

        let mut id = RecordId::new();
        // Eight digits always fit the 32-byte id
        let _ = write!(id, "-Nsim{:08}", n);
        Ok(id)
    }
}

/// Open-Meteo stand-in reporting a slowly moving sea-level reference.
struct SimFetcher {
    node: Rc<Node>,
}

impl PressureSource for SimFetcher {
    async fn fetch(&mut self) -> Result<f32, FetchError> {
        let t = self.node.unix_now() as f64;
        let hpa = 1013.25 + 4.0 * (t / 86_400.0).sin();
        info!("[weather] surface_pressure = {:.2} hPa", hpa);
        Ok(hpa as f32)
    }
}

/// The node's persistent store, shared across cycles.
struct SimStore(Rc<Node>);

impl KeyValueStore for SimStore {
    fn get(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError> {
        self.0.store.borrow_mut().get(key)
    }

    fn set(&mut self, key: StoreKey, value: StoredValue) -> Result<(), StoreError> {
        self.0.store.borrow_mut().set(key, value)
    }
}

/// Compressed deep sleep. Advances the simulated wall clock by the full
/// interval.
struct SimPower(Rc<Node>);

impl PowerControl for SimPower {
    fn deep_sleep(&mut self, duration: Duration) {
        let secs = duration.as_secs();
        info!(
            "[power] Deep sleep for {}s (simulated in {}ms)",
            secs,
            duration.as_millis() / SLEEP_COMPRESSION as u64
        );
        std::thread::sleep(std::time::Duration::from_micros(
            duration.as_micros() / SLEEP_COMPRESSION as u64,
        ));
        self.0.slept_secs.set(self.0.slept_secs.get() + secs);
        self.0
            .sensor_secs
            .set(self.0.sensor_secs.get() + secs as f64);
    }

    async fn halt(&mut self) {
        error!("[power] Halted");
    }
}

/// Uptime since this simulated boot
struct StdClock(Instant);

impl Clock for StdClock {
    fn uptime(&self) -> Duration {
        Duration::from_micros(self.0.elapsed().as_micros() as u64)
    }
}

struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}

struct Simulator;

impl Platform for Simulator {
    type Sensor = SimSensor;
    type Network = SimNetwork;
    type Session = SimSession;
    type Fetcher = SimFetcher;
    type Store = SimStore;
    type Power = SimPower;
    type Clock = StdClock;
    type Delay = StdDelay;
}

/// Fresh collaborators for one wake, as after a cold boot.
fn boot(node: &Rc<Node>) -> Parts<Simulator> {
    Parts {
        sensor: SimSensor { node: node.clone() },
        network: SimNetwork { node: node.clone() },
        session: SimSession {
            node: node.clone(),
            initialized: true,
            polls: 0,
        },
        fetcher: SimFetcher { node: node.clone() },
        store: SimStore(node.clone()),
        power: SimPower(node.clone()),
        clock: StdClock(Instant::now()),
        delay: StdDelay,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();
    info!("Starting tempo-sensor simulator");

    let mut args = std::env::args().skip(1);
    let config_bytes = match args.next() {
        Some(path) => match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("Cannot read {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };
    let cycles = match args.next().map(|s| s.parse::<u32>()) {
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            error!("Invalid cycle count: {}", e);
            return ExitCode::FAILURE;
        }
        None => DEFAULT_CYCLES,
    };

    let config = match config_bytes.as_deref().map(Config::from_json) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        None => Config::default(),
    };
    if !config.cloud.has_credentials() {
        warn!("No cloud credentials configured; the simulated session signs in anyway");
    }
    info!(
        "Wake interval {}s, auth deadline {}s, {} cycle(s)",
        config.duty_cycle.wake_interval_secs, config.duty_cycle.auth_deadline_secs, cycles
    );

    let node = Rc::new(Node::default());

    for cycle in 1..=cycles {
        info!("--- Wake {} of {} ---", cycle, cycles);
        let controller =
            DutyCycleController::new(config.duty_cycle, config.cloud.record_path, boot(&node));

        match embassy_futures::block_on(controller.run()) {
            CycleOutcome::Slept(report) => {
                if let Some(Err(e)) = &report.write {
                    warn!("Wake {} lost its record: {}", cycle, e);
                }
            }
            CycleOutcome::Halted(e) => {
                error!("Node halted: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    info!(
        "Simulator exiting after {} record(s)",
        node.records.get()
    );
    ExitCode::SUCCESS
}
