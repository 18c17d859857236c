// src/modem/io_helpers.rs

use log::trace;
use nb::Result as NbResult;

use super::attempt::{AttemptOutcome, CommandAttempt, ResponseWindow};
use super::AtClient;
use crate::common::{
    error::Error,
    hal_traits::{Clock, ModemSerial, Timer},
    timing,
};

// Implementation block for I/O related helpers
impl<IF> AtClient<'_, IF>
where
    IF: ModemSerial + Timer + Clock,
{
    /// Executes a non-blocking I/O operation (`f`) repeatedly until it
    /// stops returning `WouldBlock`, returning the final result or a timeout error.
    pub(super) fn execute_blocking_io_with_timeout<FN, T>(
        &mut self,
        timeout_ms: u32,
        mut f: FN,
    ) -> Result<T, Error<IF::Error>>
    where
        FN: FnMut(&mut IF) -> NbResult<T, IF::Error>,
    {
        let start = self.interface.now();

        loop {
            match f(&mut self.interface) {
                Ok(result) => return Ok(result),
                Err(nb::Error::WouldBlock) => {
                    if self.interface.now().since(start) >= timeout_ms {
                        return Err(Error::Timeout);
                    }
                    self.interface.delay_us(timing::SERIAL_POLL_US);
                }
                Err(nb::Error::Other(e)) => return Err(Error::Io(e)),
            }
        }
    }

    /// Writes `bytes` one at a time, waiting for the transmitter before each.
    pub(super) fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), Error<IF::Error>> {
        let timeout_ms = self.config.byte_timeout_ms;
        for byte in bytes {
            self.execute_blocking_io_with_timeout(timeout_ms, |iface| iface.write_byte(*byte))?;
        }
        Ok(())
    }

    /// Sends the attempt's command, then collects response bytes until the
    /// expected substring shows up or `budget` bytes have been received.
    ///
    /// A byte that does not arrive within the configured deadline yields
    /// [`Error::Timeout`].
    pub(super) fn run_attempt(
        &mut self,
        attempt: &CommandAttempt<'_>,
        budget: usize,
    ) -> Result<AttemptOutcome, Error<IF::Error>> {
        self.send_bytes(attempt.command)?;

        let timeout_ms = self.config.byte_timeout_ms;
        let mut window = ResponseWindow::new(budget);
        while !window.is_full() {
            let byte = self.execute_blocking_io_with_timeout(timeout_ms, |iface| iface.read_byte())?;
            window.push(byte);
            if window.ends_with(attempt.expected) {
                trace!("matched after {} bytes", window.received());
                return Ok(AttemptOutcome::Matched {
                    received: window.received(),
                });
            }
        }

        trace!("no match in {} bytes", window.received());
        Ok(AttemptOutcome::BudgetExhausted {
            received: window.received(),
        })
    }
}
