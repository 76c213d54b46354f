//! Credentials baked in at build time (see `build.rs`)

use tempo_core::config::{CloudConfig, Config, InternetConfig};

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
pub const FIREBASE_API_KEY: &str = env!("FIREBASE_API_KEY");
pub const FIREBASE_DATABASE_URL: &str = env!("FIREBASE_DATABASE_URL");
pub const FIREBASE_USER_EMAIL: &str = env!("FIREBASE_USER_EMAIL");
pub const FIREBASE_USER_PASSWORD: &str = env!("FIREBASE_USER_PASSWORD");

/// Node configuration: build-time credentials, everything else default.
pub fn config() -> Config<'static> {
    Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        cloud: CloudConfig {
            api_key: FIREBASE_API_KEY,
            database_url: FIREBASE_DATABASE_URL,
            user_email: FIREBASE_USER_EMAIL,
            user_password: FIREBASE_USER_PASSWORD,
            ..CloudConfig::default()
        },
        ..Config::default()
    }
}
