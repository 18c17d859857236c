// src/common/hal_adapter.rs

//! Glue for boards whose HAL implements `embedded-hal` 1.0.
//!
//! The sensor's data pin must be configured open-drain with a pull-up: driving
//! it high releases the line, so "input mode" is simply the released state.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::hal_traits::{Direction, Level, SensorLine, Timer};

/// Open-drain data pin plus a delay provider, usable as the sensor's interface.
pub struct OpenDrainLine<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OpenDrainLine<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Gives the pin and delay back.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P, D> SensorLine for OpenDrainLine<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    type Error = P::Error;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        match direction {
            // Releasing the line lets the pull-up (or the sensor) set the level
            Direction::Input => self.pin.set_high(),
            Direction::Output => Ok(()),
        }
    }

    fn write(&mut self, level: Level) -> Result<(), Self::Error> {
        match level {
            Level::Low => self.pin.set_low(),
            Level::High => self.pin.set_high(),
        }
    }

    fn read(&mut self) -> Result<Level, Self::Error> {
        if self.pin.is_high()? {
            Ok(Level::High)
        } else {
            Ok(Level::Low)
        }
    }
}

impl<P, D> Timer for OpenDrainLine<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
