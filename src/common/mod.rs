// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod hal_traits;
pub mod timing;

#[cfg(feature = "embedded-hal")]
pub mod hal_adapter;

// --- Re-export key types/traits for easier access ---

// From clock.rs
pub use clock::TickCounter;

// From command.rs
pub use command::{AtCommand, CommandBuffer, CommandFormatError, PayloadBuffer, UpdateRequest};

// From config.rs
pub use config::{
    AlarmThresholds, Backoff, Credentials, Endpoint, ModemConfig, MonitorConfig, RetryPolicy,
};

// From error.rs
pub use error::Error;

// From hal_traits.rs
pub use hal_traits::{
    Clock, Direction, Heartbeat, Level, Millis, ModemSerial, NoHeartbeat, SensorLine, Timer,
};

// From hal_adapter.rs
#[cfg(feature = "embedded-hal")]
pub use hal_adapter::OpenDrainLine;

// Timing constants stay namespaced: common::timing::START_PULSE_MS etc.
