use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use super::{EnvironmentSensor, RawReading, SensorError};
use crate::measurement::{Measurement, altitude_from_pressure};

/// Wraps a sensor with the bring-up retry policy and the one-shot read.
pub struct SensorReader<S> {
    sensor: S,
    attempts: u8,
    backoff: Duration,
}

impl<S: EnvironmentSensor> SensorReader<S> {
    pub fn new(sensor: S, attempts: u8, backoff: Duration) -> Self {
        Self {
            sensor,
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Bring the sensor up, retrying with a fixed pause between attempts.
    ///
    /// Exhausting every attempt means a wiring or hardware fault; the caller
    /// must treat [`SensorError::NotResponding`] as fatal.
    pub async fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), SensorError> {
        info!("Initializing {}...", S::NAME);

        for attempt in 1..=self.attempts {
            match self.sensor.init().await {
                Ok(()) => {
                    info!("{} initialized (attempt {})", S::NAME, attempt);
                    return Ok(());
                }
                Err(e) => warn!("{} init attempt {} failed: {}", S::NAME, attempt, e),
            }

            if attempt < self.attempts {
                delay.delay_ms(self.backoff.as_millis() as u32).await;
            }
        }

        Err(SensorError::NotResponding {
            sensor: S::NAME,
            attempts: self.attempts,
        })
    }

    /// Read every channel once and derive altitude from `sea_level_hpa`.
    ///
    /// A failed driver read is not retried; its channels come back as NaN.
    pub async fn read_once(&mut self, sea_level_hpa: f32, timestamp: u64) -> Measurement {
        let raw = match self.sensor.read().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{} read failed: {}", S::NAME, e);
                RawReading::UNAVAILABLE
            }
        };

        let pressure_hpa = raw.pressure_hpa();
        Measurement {
            temperature_c: raw.temperature_c,
            humidity_percent: raw.humidity_percent,
            pressure_hpa,
            altitude_m: altitude_from_pressure(pressure_hpa, sea_level_hpa),
            timestamp,
        }
    }

    /// Put the device into its sleep mode.
    pub async fn quiesce(&mut self) -> Result<(), SensorError> {
        self.sensor.sleep().await
    }
}
