//! Node configuration
//!
//! Credentials are borrowed `&str`s so the firmware can build a `Config` from
//! compile-time constants and the simulator can deserialize one in place from
//! a JSON buffer.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Database path every record is appended under
pub const DEFAULT_RECORD_PATH: &str = "temp_sensor_items";

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
#[serde(bound(deserialize = "'de: 'a"), default)]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub cloud: CloudConfig<'a>,
    pub weather: WeatherConfig,
    pub duty_cycle: DutyCycleConfig,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
#[serde(default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct CloudConfig<'a> {
    pub api_key: &'a str,
    /// e.g. `https://my-project-default-rtdb.europe-west1.firebasedatabase.app`
    pub database_url: &'a str,
    pub user_email: &'a str,
    pub user_password: &'a str,
    pub record_path: &'a str,
}

impl Default for CloudConfig<'_> {
    fn default() -> Self {
        Self {
            api_key: "",
            database_url: "",
            user_email: "",
            user_password: "",
            record_path: DEFAULT_RECORD_PATH,
        }
    }
}

impl CloudConfig<'_> {
    /// True when every credential needed to sign in is present.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
            && !self.database_url.is_empty()
            && !self.user_email.is_empty()
            && !self.user_password.is_empty()
    }
}

/// Location the sea-level reference is looked up for
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    pub latitude: f32,
    pub longitude: f32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            latitude: 54.0359,
            longitude: 19.0266,
        }
    }
}

/// Timing of one wake cycle
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DutyCycleConfig {
    /// Deep-sleep length between wakes
    pub wake_interval_secs: u32,
    /// Upper bound on the auth gate, measured from gate entry
    pub auth_deadline_secs: u32,
    /// Pause between two auth gate iterations
    pub auth_poll_interval_ms: u32,
    /// Calibration older than this is refreshed
    pub calibration_max_age_secs: u32,
    pub sensor_init_attempts: u8,
    pub sensor_init_backoff_ms: u32,
    /// Pause after putting the sensor to sleep
    pub sensor_settle_ms: u32,
    /// Pause after the radio is switched off
    pub radio_settle_ms: u32,
}

impl Default for DutyCycleConfig {
    fn default() -> Self {
        Self {
            wake_interval_secs: 60,
            auth_deadline_secs: 120,
            auth_poll_interval_ms: 100,
            calibration_max_age_secs: 24 * 60 * 60,
            sensor_init_attempts: 5,
            sensor_init_backoff_ms: 500,
            sensor_settle_ms: 1000,
            radio_settle_ms: 600,
        }
    }
}

impl DutyCycleConfig {
    pub fn wake_interval(&self) -> Duration {
        Duration::from_secs(self.wake_interval_secs as u64)
    }

    pub fn auth_deadline(&self) -> Duration {
        Duration::from_secs(self.auth_deadline_secs as u64)
    }

    pub fn auth_poll_interval(&self) -> Duration {
        Duration::from_millis(self.auth_poll_interval_ms as u64)
    }

    pub fn sensor_init_backoff(&self) -> Duration {
        Duration::from_millis(self.sensor_init_backoff_ms as u64)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config is not valid JSON")]
    Parse,
    #[error("Invalid config value: {0}")]
    Invalid(&'static str),
}

impl<'a> Config<'a> {
    /// Deserialize a config from JSON. Missing fields take their defaults.
    pub fn from_json(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        let (config, _) =
            serde_json_core::from_slice::<Config<'a>>(bytes).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a wake cycle misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let duty = &self.duty_cycle;
        if duty.wake_interval_secs == 0 {
            return Err(ConfigError::Invalid("wake_interval_secs must be non-zero"));
        }
        if duty.sensor_init_attempts == 0 {
            return Err(ConfigError::Invalid("sensor_init_attempts must be non-zero"));
        }
        if duty.auth_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("auth_poll_interval_ms must be non-zero"));
        }
        if self.cloud.record_path.is_empty() {
            return Err(ConfigError::Invalid("record_path must not be empty"));
        }
        if !(-90.0..=90.0).contains(&self.weather.latitude)
            || !(-180.0..=180.0).contains(&self.weather.longitude)
        {
            return Err(ConfigError::Invalid("latitude/longitude out of range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_design() {
        let config = Config::default();
        assert_eq!(config.duty_cycle.wake_interval_secs, 60);
        assert_eq!(config.duty_cycle.auth_deadline_secs, 120);
        assert_eq!(config.duty_cycle.calibration_max_age_secs, 86_400);
        assert_eq!(config.duty_cycle.sensor_init_attempts, 5);
        assert_eq!(config.duty_cycle.sensor_init_backoff_ms, 500);
        assert_eq!(config.cloud.record_path, "temp_sensor_items");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let json = br#"{
            "internet": { "ssid": "home", "password": "secret" },
            "duty_cycle": { "wake_interval_secs": 900 }
        }"#;
        let config = Config::from_json(json).unwrap();

        assert_eq!(config.internet.ssid, "home");
        assert_eq!(config.duty_cycle.wake_interval_secs, 900);
        // untouched fields keep their defaults
        assert_eq!(config.duty_cycle.auth_deadline_secs, 120);
        assert_eq!(config.cloud.record_path, DEFAULT_RECORD_PATH);
        assert!(!config.cloud.has_credentials());
    }

    #[test]
    fn test_from_json_rejects_zero_interval() {
        let json = br#"{ "duty_cycle": { "wake_interval_secs": 0 } }"#;
        assert_eq!(
            Config::from_json(json).unwrap_err(),
            ConfigError::Invalid("wake_interval_secs must be non-zero")
        );
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert_eq!(Config::from_json(b"not json").unwrap_err(), ConfigError::Parse);
    }
}
