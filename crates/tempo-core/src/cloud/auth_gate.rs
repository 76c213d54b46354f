use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info};
use thiserror_no_std::Error;

use super::CloudSession;
use crate::platform::Clock;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Cloud session not ready after {} ms", .waited.as_millis())]
    TimedOut { waited: Duration },
    #[error("Cloud session has no credentials")]
    NotInitialized,
}

/// Bounded wait for the cloud session to become usable.
///
/// While waiting, the gate is what drives sign-in and token refresh: each
/// iteration awaits [`CloudSession::poll`] once, then pauses for the poll
/// interval. The deadline is measured from entry, so a call returns within
/// `deadline + poll_interval` plus the duration of one `poll`.
#[derive(Debug, Clone, Copy)]
pub struct AuthGate {
    deadline: Duration,
    poll_interval: Duration,
}

impl AuthGate {
    pub fn new(deadline: Duration, poll_interval: Duration) -> Self {
        Self {
            deadline,
            poll_interval,
        }
    }

    /// Wait until `session` is ready, returning how long that took.
    pub async fn await_ready<S, C, D>(
        &self,
        session: &mut S,
        clock: &C,
        delay: &mut D,
    ) -> Result<Duration, AuthError>
    where
        S: CloudSession,
        C: Clock,
        D: DelayNs,
    {
        if !session.is_initialized() {
            return Err(AuthError::NotInitialized);
        }

        let start = clock.uptime();
        let elapsed = || {
            clock
                .uptime()
                .checked_sub(start)
                .unwrap_or(Duration::from_ticks(0))
        };

        let mut polls: u32 = 0;
        loop {
            let waited = elapsed();
            if session.is_ready() {
                info!("Cloud session ready after {} ms", waited.as_millis());
                return Ok(waited);
            }
            if waited >= self.deadline {
                return Err(AuthError::TimedOut { waited });
            }

            session.poll().await;
            polls += 1;
            if session.is_ready() {
                continue;
            }
            if polls % 50 == 0 {
                debug!("Still waiting for cloud session ({} polls)", polls);
            }

            delay.delay_ms(self.poll_interval.as_millis() as u32).await;
        }
    }
}
