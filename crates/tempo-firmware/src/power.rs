//! End-of-cycle power states

use embassy_time::{Duration, Timer};
use esp_hal::rtc_cntl::{Rtc, sleep::TimerWakeupSource};
use log::info;
use tempo_core::platform::PowerControl;

/// RTC timer deep sleep. Waking is a cold boot.
pub struct DeepSleep {
    rtc: Rtc<'static>,
}

impl DeepSleep {
    pub fn new(rtc: Rtc<'static>) -> Self {
        Self { rtc }
    }
}

impl PowerControl for DeepSleep {
    fn deep_sleep(&mut self, duration: Duration) {
        let timer = TimerWakeupSource::new(core::time::Duration::from_millis(duration.as_millis()));
        info!("Entering deep sleep");
        self.rtc.sleep_deep(&[&timer])
    }

    async fn halt(&mut self) {
        loop {
            Timer::after(Duration::from_secs(1)).await;
        }
    }
}
