//! Hardware-independent core library for tempo-sensor
//!
//! This crate contains all platform-agnostic logic for the tempo-sensor
//! duty-cycle node: the wake/measure/write/sleep state machine, the
//! sea-level-pressure calibration cache, the cloud auth gate and record
//! writer, and the collaborator traits the firmware and simulator implement.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod cloud;
pub mod config;
pub mod controller;
pub mod measurement;
pub mod platform;
pub mod sensors;
pub mod storage;
pub mod time;
pub mod weather;
