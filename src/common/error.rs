// src/common/error.rs

use crate::sensor::ReadPhase;

/// Errors raised by the single-wire reader and the modem transport.
///
/// `E` is the error type of the underlying HAL (line or serial channel).
#[derive(Debug, thiserror::Error)]
pub enum Error<E = ()>
where
    E: core::fmt::Debug, // Still need Debug for the generic Io error
{
    /// Underlying I/O error from the HAL implementation.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// The sensor did not pull the line low during the presence window.
    #[error("No response from sensor")]
    NoResponse,

    /// A frame arrived but its trailing byte does not match the sum of the data bytes.
    #[error("Checksum mismatch: expected {expected:#04x}, calculated {calculated:#04x}")]
    ChecksumMismatch { expected: u8, calculated: u8 },

    /// The line did not change level within the allowed window.
    #[error("Line stuck during {phase:?} after {waited_us} us")]
    LineTimeout { phase: ReadPhase, waited_us: u32 },

    /// The serial channel did not accept or deliver a byte before the deadline.
    #[error("Operation timed out")]
    Timeout,

    /// The receive budget filled up without the expected response showing up.
    #[error("Expected response not found in {received} bytes")]
    CommandTimeout { received: usize },

    /// A step of a command sequence failed; the sequence has to start over.
    #[error("Command sequence failed at step {step}")]
    SequenceFailure { step: usize },

    /// A bounded retry policy gave up.
    #[error("Command sequence abandoned after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// A command or payload did not fit its buffer.
    #[error("Command formatting failed")]
    CommandFormat,
}

impl<E: core::fmt::Debug> Error<E> {
    /// Whether a sequence may be restarted after this error.
    ///
    /// I/O errors from the HAL are treated as fatal, everything the remote side
    /// can cause by staying silent or answering garbage is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout | Error::CommandTimeout { .. } | Error::SequenceFailure { .. }
        )
    }
}

// Allow mapping from underlying HAL error if From is implemented
impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Io(e)
    }
}
