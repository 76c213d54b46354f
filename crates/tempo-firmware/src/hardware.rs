//! Peripheral bring-up for the sensor node

use esp_hal::{i2c::master::Config as I2cConfig, time::Rate};

pub type SensorBus = esp_hal::i2c::master::I2c<'static, esp_hal::Async>;

/// Initialize the I2C bus the BME280 sits on
///
/// Standard mode (100 kHz) on SDA = GPIO6, SCL = GPIO7. Returns `None` if
/// the controller rejects the configuration.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO6<'static>,
    scl: esp_hal::peripherals::GPIO7<'static>,
) -> Option<SensorBus> {
    let bus = esp_hal::i2c::master::I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .ok()?
    .with_sda(sda)
    .with_scl(scl)
    .into_async();
    Some(bus)
}
