//! One wake cycle: boot, authenticate, measure, write, sleep
//!
//! Every step runs exactly once and in order. Only a sensor that never comes
//! up stops the cycle short; every other failure is logged here and the cycle
//! carries on to sleep.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use log::{debug, error, info, warn};

use crate::app_state::CycleState;
use crate::cloud::{AuthError, AuthGate, CloudWriter, RecordId, WriteError};
use crate::config::DutyCycleConfig;
use crate::measurement::Measurement;
use crate::platform::{Clock, Network, NetworkError, Parts, Platform, PowerControl};
use crate::sensors::{SensorError, SensorReader};
use crate::storage::{Calibration, CalibrationCache, CalibrationSource};
use crate::time::WallClock;

/// What happened during one cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleReport {
    /// States in the order they were entered
    pub states: Vec<CycleState, { CycleState::COUNT }>,
    pub network: Option<Result<(), NetworkError>>,
    pub time_sync: Option<Result<u64, NetworkError>>,
    pub auth: Option<Result<Duration, AuthError>>,
    pub calibration: Option<Calibration>,
    pub measurement: Option<Measurement>,
    pub write: Option<Result<RecordId, WriteError>>,
    pub slept_for: Option<Duration>,
}

impl CycleReport {
    /// Most recently entered state
    pub fn state(&self) -> Option<CycleState> {
        self.states.last().copied()
    }

    fn enter(&mut self, next: CycleState) {
        debug_assert!(
            self.state()
                .map_or(next == CycleState::Booting, |current| current.next() == Some(next)),
            "cycle state skipped or moved backwards"
        );
        info!("[cycle] {}", next);
        // Each state is entered once, so the vec never overflows
        let _ = self.states.push(next);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Deep sleep was requested; the report covers the whole cycle
    Slept(CycleReport),
    /// The sensor never came up and the node stopped
    Halted(SensorError),
}

/// Runs a single wake cycle over a platform's collaborators.
pub struct DutyCycleController<'a, P: Platform> {
    config: DutyCycleConfig,
    record_path: &'a str,
    parts: Parts<P>,
}

impl<'a, P: Platform> DutyCycleController<'a, P> {
    pub fn new(config: DutyCycleConfig, record_path: &'a str, parts: Parts<P>) -> Self {
        Self {
            config,
            record_path,
            parts,
        }
    }

    /// Execute the cycle. On hardware this ends in deep sleep or a halt and
    /// never returns; elsewhere the outcome is returned for inspection.
    pub async fn run(self) -> CycleOutcome {
        let Self {
            config,
            record_path,
            parts,
        } = self;
        let Parts {
            sensor,
            mut network,
            mut session,
            mut fetcher,
            store,
            mut power,
            clock,
            mut delay,
        } = parts;

        let mut report = CycleReport::default();
        let mut reader = SensorReader::new(
            sensor,
            config.sensor_init_attempts,
            config.sensor_init_backoff(),
        );

        report.enter(CycleState::Booting);
        if let Err(e) = reader.init(&mut delay).await {
            error!("{}. Stopping.", e);
            power.halt().await;
            return CycleOutcome::Halted(e);
        }

        let connected = network.connect().await;
        match &connected {
            Ok(()) => info!("Network connected"),
            Err(e) => error!("{}", e),
        }
        report.network = Some(connected);

        let time_sync = network.sync_time().await;
        let wall_clock = match &time_sync {
            Ok(unix_secs) => {
                info!("Wall clock set to {}", unix_secs);
                WallClock::synced(*unix_secs, clock.uptime())
            }
            Err(e) => {
                warn!("{}; timestamps are boot-relative", e);
                WallClock::unsynced()
            }
        };
        report.time_sync = Some(time_sync);

        report.enter(CycleState::AwaitingAuth);
        let gate = AuthGate::new(config.auth_deadline(), config.auth_poll_interval());
        let auth = gate.await_ready(&mut session, &clock, &mut delay).await;
        if let Err(e) = &auth {
            warn!("{}; attempting the write anyway", e);
        }
        report.auth = Some(auth);

        report.enter(CycleState::Measuring);
        let timestamp = wall_clock.now(&clock);
        let calibration = CalibrationCache::new(store, config.calibration_max_age_secs as u64)
            .get(timestamp, &mut fetcher)
            .await;
        log_calibration(&calibration);

        let measurement = reader
            .read_once(calibration.sea_level_hpa, timestamp)
            .await;
        info!(
            "Measured {} C, {} %RH, {} hPa, {} m at {}",
            measurement.temperature_c,
            measurement.humidity_percent,
            measurement.pressure_hpa,
            measurement.altitude_m,
            measurement.timestamp
        );
        report.calibration = Some(calibration);
        report.measurement = Some(measurement);

        report.enter(CycleState::Writing);
        let write = CloudWriter::new()
            .write_record(&mut session, record_path, &measurement)
            .await;
        if let Err(e) = &write {
            error!("Record not written: {}", e);
        }
        report.write = Some(write);

        report.enter(CycleState::Sleeping);
        if let Err(e) = reader.quiesce().await {
            warn!("Sensor did not enter sleep mode: {}", e);
        }
        delay.delay_ms(config.sensor_settle_ms).await;
        network.shutdown().await;
        delay.delay_ms(config.radio_settle_ms).await;

        let duration = config.wake_interval();
        info!("Deep sleep for {}s", duration.as_secs());
        report.slept_for = Some(duration);
        power.deep_sleep(duration);

        CycleOutcome::Slept(report)
    }
}

fn log_calibration(calibration: &Calibration) {
    match &calibration.source {
        CalibrationSource::Cached { age_secs } => debug!(
            "Sea-level pressure {} hPa (cached, {}s old)",
            calibration.sea_level_hpa, age_secs
        ),
        CalibrationSource::Refreshed => info!(
            "Sea-level pressure {} hPa (refreshed)",
            calibration.sea_level_hpa
        ),
        CalibrationSource::RefreshedUnsaved(e) => warn!(
            "Sea-level pressure {} hPa could not be saved: {}",
            calibration.sea_level_hpa, e
        ),
        CalibrationSource::Unavailable(e) => {
            warn!("{}; altitude unavailable this cycle", e)
        }
    }
}
