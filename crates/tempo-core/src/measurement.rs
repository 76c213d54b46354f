//! The single record produced by one wake cycle

/// Standard atmosphere at sea level, hPa
pub const STANDARD_SEA_LEVEL_HPA: f32 = 1013.25;

/// One sample as it will be written to the cloud.
///
/// Built once per wake from the live sensor read and the current calibration,
/// then handed to the writer by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub pressure_hpa: f32,
    /// NaN when no sea-level reference was available
    pub altitude_m: f32,
    /// Seconds since the Unix epoch (boot-relative if time sync failed)
    pub timestamp: u64,
}

/// Altitude in metres from station pressure and a sea-level reference.
///
/// International barometric formula, both pressures in hPa. A missing
/// reference (zero, negative or non-finite) gives NaN rather than the
/// infinity the raw formula would produce.
pub fn altitude_from_pressure(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    if !sea_level_hpa.is_finite() || sea_level_hpa <= 0.0 {
        return f32::NAN;
    }
    44330.0 * (1.0 - libm::powf(pressure_hpa / sea_level_hpa, 0.1903))
}
