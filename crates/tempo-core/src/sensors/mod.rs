mod reader;

pub use reader::SensorReader;

use core::future::Future;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} did not respond after {attempts} attempts")]
    NotResponding { sensor: &'static str, attempts: u8 },
    #[error("{sensor} {operation} failed: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
}

/// Uncompensated-for-altitude readings straight from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub pressure_pa: f32,
}

impl RawReading {
    /// What a failed read reports: every channel NaN.
    pub const UNAVAILABLE: Self = Self {
        temperature_c: f32::NAN,
        humidity_percent: f32::NAN,
        pressure_pa: f32::NAN,
    };

    pub fn pressure_hpa(&self) -> f32 {
        self.pressure_pa / 100.0
    }
}

/// A combined temperature/humidity/pressure sensor.
pub trait EnvironmentSensor {
    /// Short name used in log lines and errors
    const NAME: &'static str;

    /// One initialization attempt.
    fn init(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// One measurement of all three channels.
    fn read(&mut self) -> impl Future<Output = Result<RawReading, SensorError>>;

    /// Stop sampling ahead of deep sleep.
    fn sleep(&mut self) -> impl Future<Output = Result<(), SensorError>>;
}
