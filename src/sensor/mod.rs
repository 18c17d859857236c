// src/sensor/mod.rs

// Single-wire DHT22 / AM2302 reader.

pub mod dht22; // Transaction state machine over a SensorLine
pub mod frame; // Frame layout, checksum and unit conversion

// --- Public Re-exports ---
pub use dht22::{Dht22, ReadPhase};
pub use frame::{Reading, SensorFrame};

use core::fmt::Debug;

use crate::common::{
    error::Error,
    hal_traits::{SensorLine, Timer},
};

/// Anything that yields one temperature/humidity reading per polling cycle.
pub trait ReadingSource {
    /// Error type of the underlying HAL.
    type Error: Debug;

    fn read(&mut self) -> Result<Reading, Error<Self::Error>>;
}

impl<IF> ReadingSource for Dht22<IF>
where
    IF: SensorLine + Timer,
{
    type Error = IF::Error;

    fn read(&mut self) -> Result<Reading, Error<IF::Error>> {
        Dht22::read(self)
    }
}
