#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_time::{Delay, Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::WifiDevice;
use esp_storage::FlashStorage;
use log::{error, info};

use tempo_core::controller::DutyCycleController;
use tempo_core::platform::Parts;
use tempo_core::storage::FlashStore;
use tempo_firmware::board::{Esp32Board, STORE_OFFSET};
use tempo_firmware::clock::EmbassyClock;
use tempo_firmware::firebase::FirebaseSession;
use tempo_firmware::hardware::create_i2c_bus;
use tempo_firmware::https::{
    HttpsClient, RESPONSE_BUF_SIZE, SharedHttps, TLS_READ_BUF_SIZE, TLS_WRITE_BUF_SIZE, TcpState,
};
use tempo_firmware::power::DeepSleep;
use tempo_firmware::secrets;
use tempo_firmware::sensor::Bme280Sensor;
use tempo_firmware::weather::OpenMeteoFetcher;
use tempo_firmware::wifi::WifiNetwork;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Park forever. Used when bring-up fails before the controller can run.
async fn park() -> ! {
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let node = secrets::config();
    if let Err(e) = node.validate() {
        error!("{}", e);
        park().await;
    }

    let Some(i2c) = create_i2c_bus(peripherals.I2C0, peripherals.GPIO6, peripherals.GPIO7) else {
        error!("I2C bus configuration rejected");
        park().await;
    };

    let radio = match esp_radio::init() {
        Ok(radio) => mk_static!(esp_radio::Controller<'static>, radio),
        Err(e) => {
            error!("Failed to initialize radio: {:?}", e);
            park().await;
        }
    };
    let (controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()) {
            Ok(wifi) => wifi,
            Err(e) => {
                error!("Failed to initialize Wi-Fi controller: {:?}", e);
                park().await;
            }
        };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        mk_static!(StackResources<3>, StackResources::<3>::new()),
        seed,
    );
    spawner.spawn(net_task(runner)).ok();

    let https: &'static SharedHttps = mk_static!(
        SharedHttps,
        AsyncMutex::new(HttpsClient::new(
            stack,
            mk_static!(TcpState, TcpState::new()),
            mk_static!([u8; TLS_READ_BUF_SIZE], [0; TLS_READ_BUF_SIZE]),
            mk_static!([u8; TLS_WRITE_BUF_SIZE], [0; TLS_WRITE_BUF_SIZE]),
            mk_static!([u8; RESPONSE_BUF_SIZE], [0; RESPONSE_BUF_SIZE]),
            seed,
        ))
    );

    let parts = Parts::<Esp32Board> {
        sensor: Bme280Sensor::new(i2c),
        network: WifiNetwork::new(controller, stack, node.internet),
        session: FirebaseSession::new(https, node.cloud),
        fetcher: OpenMeteoFetcher::new(https, &node.weather),
        store: FlashStore::new(FlashStorage::new(peripherals.FLASH), STORE_OFFSET),
        power: DeepSleep::new(Rtc::new(peripherals.LPWR)),
        clock: EmbassyClock,
        delay: Delay,
    };

    DutyCycleController::new(node.duty_cycle, node.cloud.record_path, parts)
        .run()
        .await;

    // Deep sleep does not return; only a halt ends up here
    park().await
}
