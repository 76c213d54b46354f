//! Collaborator traits the duty-cycle controller is generic over
//!
//! The firmware implements these with esp-hal/embassy, the simulator with
//! std, and the tests with recording fakes.

use core::future::Future;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use thiserror_no_std::Error;

use crate::cloud::CloudSession;
use crate::sensors::EnvironmentSensor;
use crate::storage::KeyValueStore;
use crate::weather::PressureSource;

/// Monotonic time since boot.
pub trait Clock {
    fn uptime(&self) -> Duration;
}

impl<C: Clock> Clock for &C {
    fn uptime(&self) -> Duration {
        (**self).uptime()
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    #[error("WiFi connection failed: {0}")]
    Connect(&'static str),
    #[error("Time sync failed: {0}")]
    TimeSync(&'static str),
}

/// Station-mode network link.
pub trait Network {
    /// Bring the link up. Resolves once an address is assigned.
    fn connect(&mut self) -> impl Future<Output = Result<(), NetworkError>>;

    /// Query network time, returning seconds since the Unix epoch.
    fn sync_time(&mut self) -> impl Future<Output = Result<u64, NetworkError>>;

    /// Disconnect and switch every radio off.
    fn shutdown(&mut self) -> impl Future<Output = ()>;
}

/// Power-state transitions that end a wake cycle.
pub trait PowerControl {
    /// Enter timed deep sleep. On hardware this does not return; the next wake
    /// is a cold boot.
    fn deep_sleep(&mut self, duration: Duration);

    /// Stop doing anything, forever. Used for unrecoverable hardware faults.
    fn halt(&mut self) -> impl Future<Output = ()>;
}

/// Everything one node build plugs into the controller.
pub trait Platform {
    type Sensor: EnvironmentSensor;
    type Network: Network;
    type Session: CloudSession;
    type Fetcher: PressureSource;
    type Store: KeyValueStore;
    type Power: PowerControl;
    type Clock: Clock;
    type Delay: DelayNs;
}

/// Owned collaborators for one process run.
pub struct Parts<P: Platform> {
    pub sensor: P::Sensor,
    pub network: P::Network,
    pub session: P::Session,
    pub fetcher: P::Fetcher,
    pub store: P::Store,
    pub power: P::Power,
    pub clock: P::Clock,
    pub delay: P::Delay,
}
