// src/common/timing.rs

// Nominal values for the AM2302/DHT22 single-wire protocol and the
// ESP8266 AT command exchange. Sensor windows are in microseconds, modem
// delays in milliseconds.

// === Single-wire start signal ===

/// Host holds the line low for this long to wake the sensor (>= 1 ms required, 18 ms used).
pub const START_PULSE_MS: u32 = 18;

// === Presence check ===

/// Delay after releasing the line before sampling for the sensor's low answer.
pub const PRESENCE_SAMPLE_US: u32 = 40;
/// Further delay before confirming the sensor's answering high pulse.
pub const PRESENCE_CONFIRM_US: u32 = 80;
/// Upper bound for the sensor's answering high pulse to end (Treh max 85 us plus slack).
pub const PRESENCE_RELEASE_TIMEOUT_US: u32 = 100;

// === Bit slots ===

/// Sample point inside a bit's high period. A `0` is high for 26-28 us, a `1` for ~70 us.
pub const BIT_SAMPLE_US: u32 = 40;
/// Upper bound for any single level transition inside the data phase.
/// Bit low periods are ~50 us and high periods at most ~75 us.
pub const TRANSITION_TIMEOUT_US: u32 = 100;
/// Poll granularity while waiting for a transition.
pub const LINE_POLL_US: u32 = 1;

// === Modem exchange ===

/// Bytes a single command may accumulate while looking for its expected response.
pub const RX_BUDGET: usize = 1023;
/// Largest receive buffer any exchange may use.
pub const RX_CAPACITY: usize = 1024;
/// How long to wait for the modem to deliver (or accept) the next byte.
pub const BYTE_TIMEOUT_MS: u32 = 2_000;
/// Poll granularity while the serial channel reports `WouldBlock`.
pub const SERIAL_POLL_US: u32 = 100;

/// Pause after every successful step before issuing the next command.
pub const STEP_SETTLE_MS: u32 = 1_000;
/// Pause before restarting a failed sequence from its first step.
pub const RETRY_DELAY_MS: u32 = 5_000;
/// Time given to the modem to push a raw payload out before the link is closed.
pub const PAYLOAD_FLUSH_MS: u32 = 3_000;

// === Polling loop ===

/// One sensor poll per second.
pub const POLL_INTERVAL_MS: u32 = 1_000;
/// Publish one field every 15 seconds.
pub const PUBLISH_INTERVAL_MS: u32 = 15_000;
