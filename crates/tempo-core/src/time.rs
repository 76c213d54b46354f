//! Wall-clock time from a one-shot SNTP exchange

use embassy_time::Duration;

use crate::platform::{Clock, NetworkError};

pub const NTP_PACKET_SIZE: usize = 48;
pub const NTP_PORT: u16 = 123;
pub const NTP_SERVER: &str = "pool.ntp.org";

/// Seconds from 1900-01-01 (NTP era 0) to 1970-01-01
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Client request: LI = 0, version 3, mode 3 (client); everything else zero.
pub fn ntp_request() -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0u8; NTP_PACKET_SIZE];
    packet[0] = 0x1B;
    packet
}

/// Unix seconds from a server reply's transmit timestamp.
pub fn parse_ntp_response(packet: &[u8]) -> Result<u64, NetworkError> {
    if packet.len() < NTP_PACKET_SIZE {
        return Err(NetworkError::TimeSync("short NTP reply"));
    }

    let mode = packet[0] & 0x07;
    if mode != 4 {
        return Err(NetworkError::TimeSync("not an NTP server reply"));
    }
    // stratum 0 is a kiss-o'-death
    if packet[1] == 0 {
        return Err(NetworkError::TimeSync("NTP server refused request"));
    }

    let seconds = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]) as u64;
    seconds
        .checked_sub(NTP_UNIX_OFFSET)
        .ok_or(NetworkError::TimeSync("NTP timestamp before 1970"))
}

/// Maps uptime to Unix time once a network time has been obtained.
///
/// Without a sync the clock reports seconds since boot, so timestamps are
/// still monotonic within a wake but not comparable across wakes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock {
    anchor: Option<(u64, Duration)>,
}

impl WallClock {
    pub const fn unsynced() -> Self {
        Self { anchor: None }
    }

    /// `unix_secs` was the time at uptime `at`.
    pub const fn synced(unix_secs: u64, at: Duration) -> Self {
        Self {
            anchor: Some((unix_secs, at)),
        }
    }

    /// Seconds since the Unix epoch, or since boot when unsynced.
    pub fn now<C: Clock>(&self, clock: &C) -> u64 {
        let uptime = clock.uptime();
        match self.anchor {
            Some((unix_secs, at)) => {
                let since = uptime.checked_sub(at).unwrap_or(Duration::from_ticks(0));
                unix_secs + since.as_secs()
            }
            None => uptime.as_secs(),
        }
    }
}
