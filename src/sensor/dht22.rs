// src/sensor/dht22.rs

use log::{debug, trace, warn};

use super::frame::{Reading, SensorFrame};
use crate::common::{
    error::Error,
    hal_traits::{Direction, Level, SensorLine, Timer},
    timing,
};

#[cfg(feature = "critical-section")]
fn with_interrupts_masked<R>(f: impl FnOnce() -> R) -> R {
    critical_section::with(|_cs| f())
}
#[cfg(not(feature = "critical-section"))]
fn with_interrupts_masked<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Where a read transaction currently is.
///
/// `Idle -> StartPulse -> AwaitingPresence -> ReadingBits(0..39) -> Validating -> Idle`,
/// with any failure dropping straight back to `Idle`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadPhase {
    Idle,
    StartPulse,
    AwaitingPresence,
    ReadingBits { bit: u8 },
    Validating,
}

/// DHT22 / AM2302 attached to a single bidirectional data line.
#[derive(Debug)]
pub struct Dht22<IF>
where
    IF: SensorLine + Timer,
{
    interface: IF,
    phase: ReadPhase,
    bits_read: u8,
}

impl<IF> Dht22<IF>
where
    IF: SensorLine + Timer,
{
    pub fn new(interface: IF) -> Self {
        Dht22 {
            interface,
            phase: ReadPhase::Idle,
            bits_read: 0,
        }
    }

    pub fn phase(&self) -> ReadPhase {
        self.phase
    }

    /// Gives the line back.
    pub fn release(self) -> IF {
        self.interface
    }

    /// One polling cycle: `Some((temperature_tenths, humidity_tenths))` on a
    /// valid frame, `None` otherwise. The caller keeps its previous reading on `None`.
    pub fn poll(&mut self) -> Option<(i16, u16)> {
        match self.read() {
            Ok(reading) => Some((reading.temperature_tenths, reading.humidity_tenths)),
            Err(e) => {
                warn!("DHT22 read failed: {}", e);
                None
            }
        }
    }

    /// Runs a complete transaction and converts the frame to physical units.
    ///
    /// Whatever the outcome, the line is released to input and the reader is
    /// back in [`ReadPhase::Idle`] when this returns. At least two seconds should
    /// pass between reads of the same sensor.
    pub fn read(&mut self) -> Result<Reading, Error<IF::Error>> {
        let mut this = scopeguard::guard(self, |this| this.finish());

        this.start_transaction()?;
        let frame = with_interrupts_masked(|| {
            if !this.await_presence()? {
                return Err(Error::NoResponse);
            }
            this.read_frame()
        })?;

        let reading = frame
            .reading()
            .map_err(|(expected, calculated)| Error::ChecksumMismatch { expected, calculated })?;
        debug!(
            "DHT22 reading: {} tenths degC, {} tenths %RH",
            reading.temperature_tenths, reading.humidity_tenths
        );
        Ok(reading)
    }

    /// Drives the line low for the wake-up pulse, then releases it.
    ///
    /// Blocks for [`timing::START_PULSE_MS`].
    pub fn start_transaction(&mut self) -> Result<(), Error<IF::Error>> {
        self.phase = ReadPhase::StartPulse;
        self.bits_read = 0;

        self.interface.set_direction(Direction::Output)?;
        self.interface.write(Level::Low)?;
        self.interface.delay_ms(timing::START_PULSE_MS);
        self.interface.set_direction(Direction::Input)?;

        self.phase = ReadPhase::AwaitingPresence;
        Ok(())
    }

    /// Checks that a sensor answered the start pulse.
    ///
    /// The sensor answers with ~80 us low followed by ~80 us high. On `true`
    /// the answering high pulse has ended and the first bit slot is starting;
    /// on `false` no bits must be read.
    pub fn await_presence(&mut self) -> Result<bool, Error<IF::Error>> {
        self.phase = ReadPhase::AwaitingPresence;

        self.interface.delay_us(timing::PRESENCE_SAMPLE_US);
        if self.interface.read()?.is_high() {
            trace!("DHT22 did not pull the line low");
            return Ok(false);
        }

        self.interface.delay_us(timing::PRESENCE_CONFIRM_US);
        if self.interface.read()?.is_low() {
            trace!("DHT22 answering pulse never went high");
            return Ok(false);
        }

        self.wait_for(Level::Low, timing::PRESENCE_RELEASE_TIMEOUT_US)?;
        self.phase = ReadPhase::ReadingBits { bit: 0 };
        Ok(true)
    }

    /// Reads the next 8 bits, most significant first.
    ///
    /// Each bit is ~50 us low followed by a high pulse whose length encodes the
    /// value; sampling 40 us into the high period tells a short `0` from a long `1`.
    pub fn read_byte(&mut self) -> Result<u8, Error<IF::Error>> {
        let mut byte = 0u8;
        for _ in 0..8 {
            self.phase = ReadPhase::ReadingBits { bit: self.bits_read };

            self.wait_for(Level::High, timing::TRANSITION_TIMEOUT_US)?;
            self.interface.delay_us(timing::BIT_SAMPLE_US);
            let level = self.interface.read()?;

            byte <<= 1;
            if level.is_high() {
                byte |= 1;
            }
            // A `0` is already low again, a `1` still has ~30 us to go
            self.wait_for(Level::Low, timing::TRANSITION_TIMEOUT_US)?;
            self.bits_read = self.bits_read.saturating_add(1);
        }
        trace!("DHT22 byte {:#04x}", byte);
        Ok(byte)
    }

    /// Reads humidity, temperature and checksum bytes and verifies the checksum.
    pub fn read_frame(&mut self) -> Result<SensorFrame, Error<IF::Error>> {
        let mut bytes = [0u8; 5];
        for byte in bytes.iter_mut() {
            *byte = self.read_byte()?;
        }

        self.phase = ReadPhase::Validating;
        let frame = SensorFrame::from_bytes(bytes);
        if !frame.is_valid() {
            return Err(Error::ChecksumMismatch {
                expected: frame.checksum,
                calculated: frame.calculated_checksum(),
            });
        }
        Ok(frame)
    }

    /// Polls until the line reaches `level`, giving up after `timeout_us`.
    ///
    /// Elapsed time is counted in poll steps, so the real window is never
    /// shorter than `timeout_us`. Returns the time waited.
    fn wait_for(&mut self, level: Level, timeout_us: u32) -> Result<u32, Error<IF::Error>> {
        let mut waited_us = 0;
        loop {
            if self.interface.read()? == level {
                return Ok(waited_us);
            }
            if waited_us >= timeout_us {
                return Err(Error::LineTimeout {
                    phase: self.phase,
                    waited_us,
                });
            }
            self.interface.delay_us(timing::LINE_POLL_US);
            waited_us += timing::LINE_POLL_US;
        }
    }

    // Reset the line to the sensor's idle state. Errors are dropped so the caller
    // sees the first error of the transaction.
    fn finish(&mut self) {
        let _ = self.interface.set_direction(Direction::Input);
        self.phase = ReadPhase::Idle;
    }
}
