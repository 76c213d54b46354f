//! The concrete node: which adapter fills each collaborator slot

use esp_storage::FlashStorage;
use tempo_core::platform::Platform;
use tempo_core::storage::FlashStore;

use crate::clock::EmbassyClock;
use crate::firebase::FirebaseSession;
use crate::hardware::SensorBus;
use crate::power::DeepSleep;
use crate::sensor::Bme280Sensor;
use crate::weather::OpenMeteoFetcher;
use crate::wifi::WifiNetwork;

/// Calibration image location: the first sector of the default `nvs`
/// partition, which nothing else on this firmware uses.
pub const STORE_OFFSET: u32 = 0x9000;

pub struct Esp32Board;

impl Platform for Esp32Board {
    type Sensor = Bme280Sensor<SensorBus>;
    type Network = WifiNetwork;
    type Session = FirebaseSession;
    type Fetcher = OpenMeteoFetcher;
    type Store = FlashStore<FlashStorage<'static>>;
    type Power = DeepSleep;
    type Clock = EmbassyClock;
    type Delay = embassy_time::Delay;
}
