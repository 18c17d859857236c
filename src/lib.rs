// src/lib.rs

//! Firmware core of a room fire detection node: a DHT22 temperature/humidity
//! reader and an ESP8266 AT command client that publishes readings over WiFi.
//!
//! The crate is `no_std` and talks to hardware only through the traits in
//! [`common::hal_traits`], so it runs the same against a board HAL and the
//! simulated interfaces used in the tests.

#![no_std] // Specify no_std at the crate root

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod common;
pub mod modem;
pub mod monitor;
pub mod sensor;

// Re-export key types for convenience
pub use common::Error;
pub use modem::AtClient;
pub use monitor::{CycleReport, Monitor, SensorOutcome};
pub use sensor::{Dht22, Reading, ReadingSource};
