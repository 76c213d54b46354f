use heapless::String;
use log::{error, info};
use tempo_core::config::WeatherConfig;
use tempo_core::weather::{self, FORECAST_URL_LEN, FetchError, PressureSource};

use crate::https::SharedHttps;

/// Current surface pressure from Open-Meteo for a fixed location.
pub struct OpenMeteoFetcher {
    http: &'static SharedHttps,
    url: Option<String<FORECAST_URL_LEN>>,
}

impl OpenMeteoFetcher {
    pub fn new(http: &'static SharedHttps, location: &WeatherConfig) -> Self {
        let url = weather::forecast_url(location).ok();
        if url.is_none() {
            error!("Forecast URL does not fit {} bytes", FORECAST_URL_LEN);
        }
        Self { http, url }
    }
}

impl PressureSource for OpenMeteoFetcher {
    async fn fetch(&mut self) -> Result<f32, FetchError> {
        let url = self
            .url
            .as_ref()
            .ok_or(FetchError::Transport("forecast URL unavailable"))?;
        info!("Fetching sea-level pressure");

        let mut http = self.http.lock().await;
        http.get(url, weather::parse_surface_pressure)
            .await
            .map_err(|e| FetchError::Transport(e.as_str()))?
    }
}
