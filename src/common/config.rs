// src/common/config.rs

//! Runtime configuration for the modem client and the polling loop.
//!
//! Defaults reproduce the behaviour of the deployed firmware: block forever
//! while joining the network, publish one field every 15 seconds.

use super::timing;

/// How the delay between sequence restarts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Always wait the base delay.
    Fixed,
    /// Double the delay after every failed attempt, never exceeding `max_ms`.
    Exponential { max_ms: u32 },
}

/// Retry behaviour of a command sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, `None` retries until the sequence succeeds.
    pub max_attempts: Option<u32>,
    /// Delay before the first restart.
    pub delay_ms: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Block until success. Acceptable for one-time bring-up only.
    pub const fn forever(delay_ms: u32) -> Self {
        Self {
            max_attempts: None,
            delay_ms,
            backoff: Backoff::Fixed,
        }
    }

    /// Give up after `max_attempts` full passes over the sequence.
    pub const fn bounded(max_attempts: u32, delay_ms: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay_ms,
            backoff,
        }
    }

    /// Delay to apply after `failures` failed passes (1-based).
    pub fn delay_after(&self, failures: u32) -> u32 {
        match self.backoff {
            Backoff::Fixed => self.delay_ms,
            Backoff::Exponential { max_ms } => {
                let shift = failures.saturating_sub(1).min(31);
                self.delay_ms
                    .checked_mul(1u32 << shift)
                    .unwrap_or(u32::MAX)
                    .min(max_ms)
            }
        }
    }

    /// Whether another pass is allowed after `attempts` passes have failed.
    pub fn allows_another(&self, attempts: u32) -> bool {
        match self.max_attempts {
            None => true,
            Some(max) => attempts < max,
        }
    }
}

/// Tuning of the command/response transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemConfig {
    /// Receive budget per command in bytes; clamped to [`timing::RX_CAPACITY`].
    pub rx_budget: usize,
    /// Deadline for each byte to be accepted or delivered by the serial channel.
    pub byte_timeout_ms: u32,
    /// Pause after every successful step.
    pub settle_ms: u32,
    /// Pause after a raw payload write.
    pub flush_ms: u32,
    /// Policy for the network join sequence.
    pub join_retry: RetryPolicy,
    /// Policy for the steady-state publish sequence.
    pub publish_retry: RetryPolicy,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            rx_budget: timing::RX_BUDGET,
            byte_timeout_ms: timing::BYTE_TIMEOUT_MS,
            settle_ms: timing::STEP_SETTLE_MS,
            flush_ms: timing::PAYLOAD_FLUSH_MS,
            join_retry: RetryPolicy::forever(timing::RETRY_DELAY_MS),
            publish_retry: RetryPolicy::forever(timing::RETRY_DELAY_MS),
        }
    }
}

impl ModemConfig {
    /// Same as the default, but publishing gives up after `max_attempts`
    /// with exponential backoff capped at one minute.
    pub fn steady_state(max_attempts: u32) -> Self {
        Self {
            publish_retry: RetryPolicy::bounded(
                max_attempts,
                timing::RETRY_DELAY_MS,
                Backoff::Exponential { max_ms: 60_000 },
            ),
            ..Self::default()
        }
    }
}

/// WiFi network to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Telemetry endpoint readings are published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Multiplexed connection id used for open/send/close.
    pub link_id: u8,
    pub api_key: &'a str,
}

impl<'a> Endpoint<'a> {
    /// ThingSpeak's HTTP update endpoint with the given write key.
    pub const fn thingspeak(api_key: &'a str) -> Self {
        Self {
            host: "api.thingspeak.com",
            port: 80,
            link_id: 0,
            api_key,
        }
    }
}

/// Reading limits that switch the buzzer on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmThresholds {
    /// Alarm when temperature is at or above this value (tenths of a degree).
    pub temperature_high_tenths: i16,
    /// Alarm when humidity is at or below this value (tenths of a percent).
    pub humidity_low_tenths: u16,
}

impl Default for AlarmThresholds {
    fn default() -> Self {
        Self {
            temperature_high_tenths: 400,
            humidity_low_tenths: 300,
        }
    }
}

/// Settings of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval_ms: u32,
    pub publish_interval_ms: u32,
    pub temperature_field: u8,
    pub humidity_field: u8,
    pub alarm: AlarmThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            publish_interval_ms: timing::PUBLISH_INTERVAL_MS,
            temperature_field: 3,
            humidity_field: 2,
            alarm: AlarmThresholds::default(),
        }
    }
}
