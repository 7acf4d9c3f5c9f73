#![cfg_attr(not(test), no_std)]

//! # Mizu sensor hub
//!
//! Reads battery voltage, board temperature, ambient temperature/humidity,
//! soil moisture and a GPS fix once per second and reports one
//! `key=value` line per sample over a serial link.
//!
//! Everything except the `hardware` module is independent of the board and is unit
//! tested on the host. Enable the `esp32s3` feature to build the firmware.

pub mod config;
pub mod dht11;
pub mod error;
pub mod format;
pub mod logic;
pub mod model;
pub mod nmea;
pub mod traits;
pub mod units;

#[cfg(feature = "esp32s3")]
pub mod hardware;
