// src/common/hal_traits.rs

use core::fmt::Debug;

/// Abstraction for the blocking delays both protocol engines rely on.
pub trait Timer {
    /// Delay for at least the specified number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }
}

/// A free-running millisecond count, wrapping at `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Millis(pub u32);

impl Millis {
    /// Milliseconds elapsed since `earlier`, correct across one wrap of the counter.
    #[inline]
    pub const fn since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// Read-only view of the monotonic millisecond clock.
///
/// Only the tick source writes the clock; everything in this crate just reads it.
pub trait Clock {
    fn now(&self) -> Millis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Millis {
        (**self).now()
    }
}

/// Direction of the single-wire data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Released; the external pull-up holds the line high unless the sensor drives it.
    Input,
    /// Driven by the host.
    Output,
}

/// Logic level of the data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    #[inline]
    pub const fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }
}

/// Bidirectional single-wire GPIO used to talk to the humidity/temperature sensor.
pub trait SensorLine {
    /// Associated error type for pin access errors.
    type Error: Debug;

    /// Switches the line between driving (output) and sampling (input).
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Drives the line to `level`. Only meaningful in output mode.
    fn write(&mut self, level: Level) -> Result<(), Self::Error>;

    /// Samples the current line level.
    fn read(&mut self) -> Result<Level, Self::Error>;
}

/// Byte-oriented serial channel to the WiFi modem.
pub trait ModemSerial {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Attempts to read a single byte from the serial interface.
    ///
    /// Returns `Ok(byte)` if a byte was read, or `Err(nb::Error::WouldBlock)`
    /// if no byte is available yet.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte to the serial interface.
    ///
    /// Returns `Ok(())` if the byte was accepted for transmission, or `Err(nb::Error::WouldBlock)`
    /// if the transmitter is still busy.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;
}

/// Liveness hook fed between the slow steps of a command sequence.
///
/// Typically refreshes a hardware watchdog so that a long bring-up loop does not
/// reset the board.
pub trait Heartbeat {
    fn beat(&mut self);
}

impl<F: FnMut()> Heartbeat for F {
    fn beat(&mut self) {
        self()
    }
}

/// Heartbeat that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeartbeat;

impl Heartbeat for NoHeartbeat {
    fn beat(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_since_wraps() {
        assert_eq!(Millis(1_500).since(Millis(500)), 1_000);
        assert_eq!(Millis(10).since(Millis(u32::MAX - 9)), 20);
    }

    #[test]
    fn test_closure_heartbeat() {
        let mut beats = 0;
        {
            let mut hb = || beats += 1;
            hb.beat();
            hb.beat();
        }
        assert_eq!(beats, 2);
    }
}
