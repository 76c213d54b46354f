use embassy_time::{Duration, Instant};
use tempo_core::platform::Clock;

/// Uptime from the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn uptime(&self) -> Duration {
        Duration::from_ticks(Instant::now().as_ticks())
    }
}
