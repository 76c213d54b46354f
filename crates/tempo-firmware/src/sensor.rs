use bme280::i2c::AsyncBME280;
use embedded_hal_async::i2c::I2c;
use tempo_core::sensors::{EnvironmentSensor, RawReading, SensorError};

/// Bosch BME280 at the primary address (0x76), used in forced mode.
///
/// The driver never leaves the device sampling. `init` soft-resets it, and
/// reset puts `ctrl_meas` (0xF4) mode bits at `00`, which is sleep. `measure`
/// writes forced mode (`01`) and only returns after reading the result
/// registers. The device drops back to `00` on its own once a forced
/// conversion completes, so it is already asleep whenever `sleep` runs.
pub struct Bme280Sensor<I> {
    device: AsyncBME280<I>,
    delay: embassy_time::Delay,
}

impl<I: I2c> Bme280Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            device: AsyncBME280::new_primary(i2c),
            delay: embassy_time::Delay,
        }
    }
}

impl<I: I2c> EnvironmentSensor for Bme280Sensor<I> {
    const NAME: &'static str = "BME280";

    async fn init(&mut self) -> Result<(), SensorError> {
        self.device.init(&mut self.delay).await.map_err(|e| {
            log::debug!("BME280 init error: {:?}", e);
            SensorError::InitializationFailed {
                sensor: Self::NAME,
                details: "no valid chip id at 0x76",
            }
        })
    }

    async fn read(&mut self) -> Result<RawReading, SensorError> {
        let measurement = self.device.measure(&mut self.delay).await.map_err(|e| {
            log::error!("BME280 measurement failed: {:?}", e);
            SensorError::ReadFailed {
                sensor: Self::NAME,
                operation: "measure temperature/humidity/pressure",
                details: "I2C communication error or sensor not responding",
            }
        })?;

        Ok(RawReading {
            temperature_c: measurement.temperature,
            humidity_percent: measurement.humidity,
            pressure_pa: measurement.pressure,
        })
    }

    async fn sleep(&mut self) -> Result<(), SensorError> {
        // Forced mode: ctrl_meas already reads sleep after the last `measure`
        log::debug!("BME280 idle in sleep mode");
        Ok(())
    }
}
