//! Sea-level pressure lookup against the Open-Meteo forecast API

use core::fmt::Write;
use core::future::Future;
use core::ops::RangeInclusive;

use heapless::String;
use serde::Deserialize;
use thiserror_no_std::Error;

use crate::config::WeatherConfig;

/// Anything outside this range is a parsing or upstream fault, not weather.
pub const PLAUSIBLE_PRESSURE_HPA: RangeInclusive<f32> = 300.0..=1100.0;

/// Room for the forecast URL with full-precision coordinates
pub const FORECAST_URL_LEN: usize = 160;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FetchError {
    #[error("Weather API returned HTTP {0}")]
    Status(u16),
    #[error("Weather request failed: {0}")]
    Transport(&'static str),
    #[error("Weather response has no numeric current.surface_pressure")]
    Malformed,
    #[error("Weather API reported implausible pressure {0} hPa")]
    Implausible(f32),
}

/// Source of the current sea-level pressure.
pub trait PressureSource {
    /// Exactly one lookup, in hPa. Implementations do not retry.
    fn fetch(&mut self) -> impl Future<Output = Result<f32, FetchError>>;
}

impl<T: PressureSource> PressureSource for &mut T {
    fn fetch(&mut self) -> impl Future<Output = Result<f32, FetchError>> {
        (**self).fetch()
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Deserialize)]
struct CurrentConditions {
    surface_pressure: f32,
}

/// Build the forecast request URL for `weather`'s coordinates.
pub fn forecast_url(weather: &WeatherConfig) -> Result<String<FORECAST_URL_LEN>, core::fmt::Error> {
    let mut url = String::new();
    write!(
        url,
        "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}&current=surface_pressure",
        weather.latitude, weather.longitude
    )?;
    Ok(url)
}

/// Extract `current.surface_pressure` from a forecast response.
///
/// Any status other than 200 is an error regardless of the body. Unknown
/// fields are ignored.
pub fn parse_surface_pressure(status: u16, body: &[u8]) -> Result<f32, FetchError> {
    if status != 200 {
        return Err(FetchError::Status(status));
    }

    let (response, _) = serde_json_core::from_slice::<ForecastResponse>(body)
        .map_err(|_| FetchError::Malformed)?;
    let pressure = response.current.surface_pressure;

    if !PLAUSIBLE_PRESSURE_HPA.contains(&pressure) {
        return Err(FetchError::Implausible(pressure));
    }
    Ok(pressure)
}
