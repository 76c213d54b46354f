//! ESP32-S3 firmware-specific modules for tempo-sensor
//!
//! This crate contains the hardware adapters behind the `tempo_core`
//! collaborator traits: the BME280 on I2C, WiFi with SNTP, an HTTPS client
//! shared by the Firebase session and the Open-Meteo fetcher, flash-backed
//! calibration storage and RTC deep sleep.

#![no_std]

extern crate alloc;

pub mod board;
pub mod clock;
pub mod firebase;
pub mod hardware;
pub mod https;
pub mod power;
pub mod secrets;
pub mod sensor;
pub mod weather;
pub mod wifi;
